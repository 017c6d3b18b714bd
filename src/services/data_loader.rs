//! Snapshot pipeline: locate sources, scan logs, reduce, read the cache, merge

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::parsers::{ClaudeLogParser, LogParser};
use crate::services::cache::StatsCacheReader;
use crate::services::directory::ModelDirectory;
use crate::services::locator::SourceLocator;
use crate::services::merger::{MergeContext, StatsMerger};
use crate::services::pricing::{NoPricing, PricingResolver, PricingService};
use crate::services::reducer::UsageReducer;
use crate::types::{Period, Result, StatsSnapshot};

/// Everything one run needs to know up front
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub period: Period,
    /// Comma-separated data roots, replacing the default candidates
    pub data_dirs: Option<String>,
    /// Use the on-disk pricing cache only
    pub offline: bool,
    /// Defaults to `~/.ccwrapped/pricing.json`
    pub pricing_cache: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            data_dirs: None,
            offline: false,
            pricing_cache: None,
        }
    }
}

pub struct DataLoaderService {
    config: EngineConfig,
    locator: SourceLocator,
    parser: ClaudeLogParser,
}

impl DataLoaderService {
    pub fn new(config: EngineConfig) -> Self {
        let locator = SourceLocator::new(config.data_dirs.as_deref());
        Self::with_locator(config, locator)
    }

    pub fn with_locator(config: EngineConfig, locator: SourceLocator) -> Self {
        Self {
            config,
            locator,
            parser: ClaudeLogParser::new(),
        }
    }

    /// Build the snapshot with LiteLLM pricing, or without prices if the
    /// table is unavailable
    pub fn load(&self) -> Result<StatsSnapshot> {
        match self.load_pricing() {
            Some(pricing) => self.build(&pricing, &pricing, Utc::now()),
            None => self.build(&NoPricing, &NoPricing, Utc::now()),
        }
    }

    fn load_pricing(&self) -> Option<PricingService> {
        let path = match &self.config.pricing_cache {
            Some(p) => p.clone(),
            None => match PricingService::default_cache_path() {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "no pricing cache location, costs limited to recorded values");
                    return None;
                }
            },
        };
        match PricingService::load(&path, self.config.offline) {
            Ok(service) => Some(service),
            Err(e) => {
                warn!(error = %e, "pricing unavailable, costs limited to recorded values");
                None
            }
        }
    }

    /// Run the pipeline against explicit collaborators and clock
    pub fn build(
        &self,
        pricing: &dyn PricingResolver,
        directory: &dyn ModelDirectory,
        now: DateTime<Utc>,
    ) -> Result<StatsSnapshot> {
        let period = self.config.period;

        let roots = self.locator.project_dirs();
        if roots.is_empty() {
            debug!("no project directories found");
        }
        let events = self.parser.scan(&roots);
        let live = UsageReducer::reduce(period, pricing, &events);
        info!(
            %period,
            events = events.len(),
            in_period = live.event_count,
            "live scan complete"
        );

        let cache = StatsCacheReader::load(self.locator.stats_cache_path().as_deref())?;
        if cache.is_some() {
            debug!("stats cache loaded");
        }

        let ctx = MergeContext {
            period,
            now,
            pricing,
            directory,
        };
        Ok(StatsMerger::merge(&ctx, &live, cache.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataSource, WrappedError};
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn fixtures() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 31, 12, 0, 0).unwrap()
    }

    fn loader(root: &Path, period: Period) -> DataLoaderService {
        let mut config = EngineConfig::new(period);
        config.data_dirs = Some(root.to_string_lossy().to_string());
        let locator = SourceLocator::with_candidates(config.data_dirs.as_deref(), Vec::new());
        DataLoaderService::with_locator(config, locator)
    }

    fn copy_logs(root: &Path) {
        let projects = root.join("projects").join("demo");
        fs::create_dir_all(&projects).unwrap();
        for name in ["file1.jsonl", "file2.jsonl"] {
            fs::copy(fixtures().join("multi").join(name), projects.join(name)).unwrap();
        }
    }

    #[test]
    fn test_no_sources_is_empty_snapshot() {
        let temp = TempDir::new().unwrap();
        let snapshot = loader(temp.path(), Period::year(2025))
            .build(&NoPricing, &NoPricing, now())
            .unwrap();
        assert!(!snapshot.has_data);
        assert_eq!(snapshot.total_tokens, 0);
    }

    #[test]
    fn test_live_logs_are_deduplicated_end_to_end() {
        let temp = TempDir::new().unwrap();
        copy_logs(temp.path());

        let snapshot = loader(temp.path(), Period::year(2025))
            .build(&NoPricing, &NoPricing, now())
            .unwrap();
        assert_eq!(snapshot.sources.activity, DataSource::Live);
        assert_eq!(snapshot.total_messages, 2);
        // 1000 + 500 and 2000 + 1000; the duplicate is dropped
        assert_eq!(snapshot.total_tokens, 4500);
        assert_eq!(snapshot.top_models.len(), 2);
    }

    #[test]
    fn test_cache_only_root() {
        let temp = TempDir::new().unwrap();
        fs::copy(
            fixtures().join("stats-cache.json"),
            temp.path().join("stats-cache.json"),
        )
        .unwrap();

        let snapshot = loader(temp.path(), Period::year(2025))
            .build(&NoPricing, &NoPricing, now())
            .unwrap();
        assert_eq!(snapshot.sources.activity, DataSource::CacheDaily);
        assert_eq!(snapshot.total_messages, 30);
        assert_eq!(snapshot.total_tokens, 1800);
    }

    #[test]
    fn test_corrupt_cache_fails_the_run() {
        let temp = TempDir::new().unwrap();
        copy_logs(temp.path());
        fs::write(temp.path().join("stats-cache.json"), "not json").unwrap();

        let result = loader(temp.path(), Period::year(2025)).build(&NoPricing, &NoPricing, now());
        assert!(matches!(result, Err(WrappedError::Cache(_))));
    }

    #[test]
    fn test_offline_without_pricing_cache_still_loads() {
        let temp = TempDir::new().unwrap();
        copy_logs(temp.path());
        let mut config = EngineConfig::new(Period::year(2025));
        config.offline = true;
        config.pricing_cache = Some(temp.path().join("missing-pricing.json"));
        let raw = temp.path().to_string_lossy().to_string();
        let locator = SourceLocator::with_candidates(Some(&raw), Vec::new());

        let snapshot = DataLoaderService::with_locator(config, locator).load().unwrap();
        assert_eq!(snapshot.total_tokens, 4500);
    }
}
