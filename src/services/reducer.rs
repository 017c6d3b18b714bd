//! Usage reducer: folds deduplicated events into a live [`UsageSummary`]

use crate::services::pricing::{PricingMemo, PricingResolver};
use crate::types::{Period, RawEvent, UsageSummary};

/// Single-owner accumulator for one run
pub struct UsageReducer<'a> {
    period: Period,
    pricing: PricingMemo<'a>,
    summary: UsageSummary,
}

impl<'a> UsageReducer<'a> {
    pub fn new(period: Period, pricing: &'a dyn PricingResolver) -> Self {
        Self {
            period,
            pricing: PricingMemo::new(pricing),
            summary: UsageSummary::default(),
        }
    }

    /// Fold `events` (already deduplicated) into a summary
    pub fn reduce<'e>(
        period: Period,
        pricing: &'a dyn PricingResolver,
        events: impl IntoIterator<Item = &'e RawEvent>,
    ) -> UsageSummary {
        let mut reducer = Self::new(period, pricing);
        for event in events {
            reducer.push(event);
        }
        reducer.finish()
    }

    pub fn push(&mut self, event: &RawEvent) {
        let (Some(timestamp), Some(date)) = (event.timestamp, event.local_date()) else {
            return;
        };
        if !self.period.contains(date) {
            return;
        }

        let summary = &mut self.summary;
        if summary.earliest.map_or(true, |earliest| timestamp < earliest) {
            summary.earliest = Some(timestamp);
        }

        *summary.daily_activity.entry(date).or_insert(0) += 1;
        summary.event_count += 1;
        summary.tool_calls = summary.tool_calls.saturating_add(event.tool_calls);

        if let Some(session) = event.session_id.as_deref().filter(|s| !s.trim().is_empty()) {
            if !summary.sessions.contains(session) {
                summary.sessions.insert(session.to_string());
            }
        }

        if let Some(cost) = event.cost_usd {
            summary.total_cost_usd += cost;
        }

        let Some(usage) = event.usage else {
            return;
        };
        let record_total = usage.total();
        if record_total == 0 {
            return;
        }

        summary.tokens.add(&usage);
        summary.total_tokens = summary.total_tokens.saturating_add(record_total);

        if let Some(model) = event.model.as_deref() {
            summary.model_tokens.add(model, record_total);
            if event.cost_usd.is_none() {
                summary.total_cost_usd += self.pricing.estimate(model, &usage);
            }
        }
    }

    pub fn finish(self) -> UsageSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{ClaudeLogParser, LogParser};
    use crate::services::pricing::{ModelPricing, NoPricing};
    use crate::types::TokenCounts;
    use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
    use std::path::PathBuf;

    struct FlatPricing;

    impl PricingResolver for FlatPricing {
        fn unit_price(&self, model: &str) -> Option<ModelPricing> {
            // $1 per 1M tokens in every category, only for sonnet
            model.contains("sonnet").then(|| ModelPricing {
                input_cost_per_token: Some(0.000001),
                output_cost_per_token: Some(0.000001),
                cache_read_input_token_cost: Some(0.000001),
                cache_creation_input_token_cost: Some(0.000001),
                litellm_provider: None,
            })
        }
    }

    /// Local noon, so the local date is the calendar date in every timezone
    fn local_noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn event(
        (y, m, d): (i32, u32, u32),
        model: Option<&str>,
        input: u64,
        output: u64,
        cost: Option<f64>,
    ) -> RawEvent {
        RawEvent {
            timestamp: Some(local_noon(y, m, d)),
            session_id: Some(format!("s-{}", d)),
            model: model.map(String::from),
            usage: Some(TokenCounts {
                input_tokens: input,
                output_tokens: output,
                ..Default::default()
            }),
            cost_usd: cost,
            ..Default::default()
        }
    }

    #[test]
    fn test_reduce_empty() {
        let summary = UsageReducer::reduce(Period::year(2025), &NoPricing, &Vec::<RawEvent>::new());
        assert!(summary.daily_activity.is_empty());
        assert_eq!(summary.event_count, 0);
        assert!(summary.earliest.is_none());
        assert!(!summary.has_token_signal());
    }

    #[test]
    fn test_reduce_fixture_file() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("claude-sample.jsonl");
        let events = ClaudeLogParser::new().parse_file(&path).unwrap();
        let summary = UsageReducer::reduce(Period::year(2025), &FlatPricing, &events);

        // 5 timestamped records; the summary line has no timestamp
        assert_eq!(summary.event_count, 5);
        assert_eq!(summary.sessions.len(), 2);
        assert_eq!(summary.tool_calls, 1);
        assert_eq!(summary.tokens.input_tokens, 600);
        assert_eq!(summary.tokens.output_tokens, 300);
        assert_eq!(summary.tokens.cache_read_tokens, 20);
        assert_eq!(summary.tokens.cache_write_tokens, 10);
        assert_eq!(summary.total_tokens, 930);
        assert_eq!(summary.model_tokens.get("claude-sonnet-4-20250514"), Some(630));
        assert_eq!(summary.model_tokens.get("claude-opus-4-20250514"), Some(300));

        // opus carries costUSD 0.025; sonnet is estimated at $1/1M over 630 tokens
        let expected = 0.025 + 630.0 * 0.000001;
        assert!((summary.total_cost_usd - expected).abs() < 1e-10);
    }

    #[test]
    fn test_year_filter_excludes_other_years() {
        let events = vec![
            event((2024, 12, 31), Some("claude-sonnet-4"), 100, 0, None),
            event((2025, 6, 1), Some("claude-sonnet-4"), 10, 0, None),
            event((2026, 1, 1), Some("claude-sonnet-4"), 1000, 0, None),
        ];
        let summary = UsageReducer::reduce(Period::year(2025), &NoPricing, &events);

        assert_eq!(summary.event_count, 1);
        assert_eq!(summary.total_tokens, 10);
        assert!(summary.daily_activity.keys().all(|d| d.year() == 2025));
        assert_eq!(summary.earliest, Some(local_noon(2025, 6, 1)));
    }

    #[test]
    fn test_year_edges_bucket_by_local_date() {
        // Last and first instants of local 2025, wherever the test runs
        let first = Local
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        let last = Local
            .with_ymd_and_hms(2025, 12, 31, 23, 59, 59)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        let mut before = event((2025, 1, 1), None, 1, 0, None);
        before.timestamp = Some(first - chrono::Duration::seconds(1));
        let mut start = event((2025, 1, 1), None, 10, 0, None);
        start.timestamp = Some(first);
        let mut end = event((2025, 1, 1), None, 100, 0, None);
        end.timestamp = Some(last);
        let mut after = event((2025, 1, 1), None, 1000, 0, None);
        after.timestamp = Some(last + chrono::Duration::seconds(1));

        let summary =
            UsageReducer::reduce(Period::year(2025), &NoPricing, &[before, start, end, after]);
        assert_eq!(summary.event_count, 2);
        assert_eq!(summary.total_tokens, 110);
        assert!(summary.daily_activity.keys().all(|d| d.year() == 2025));
    }

    #[test]
    fn test_month_period() {
        let events = vec![
            event((2025, 1, 31), Some("m"), 1, 0, None),
            event((2025, 2, 1), Some("m"), 2, 0, None),
        ];
        let period = Period::month(2025, 2).unwrap();
        let summary = UsageReducer::reduce(period, &NoPricing, &events);
        assert_eq!(summary.total_tokens, 2);
        assert_eq!(summary.daily_activity.len(), 1);
    }

    #[test]
    fn test_earliest_is_minimum() {
        let events = vec![
            event((2025, 3, 10), None, 0, 0, None),
            event((2025, 1, 5), None, 0, 0, None),
            event((2025, 2, 1), None, 0, 0, None),
        ];
        let summary = UsageReducer::reduce(Period::year(2025), &NoPricing, &events);
        assert_eq!(summary.earliest, Some(local_noon(2025, 1, 5)));
    }

    #[test]
    fn test_zero_token_usage_contributes_nothing_but_counts_event() {
        let events = vec![event((2025, 1, 1), Some("claude-sonnet-4"), 0, 0, None)];
        let summary = UsageReducer::reduce(Period::year(2025), &FlatPricing, &events);
        assert_eq!(summary.event_count, 1);
        assert!(summary.model_tokens.is_empty());
        assert_eq!(summary.total_tokens, 0);
        assert_eq!(summary.total_cost_usd, 0.0);
    }

    #[test]
    fn test_explicit_cost_is_not_re_estimated() {
        let events = vec![event((2025, 1, 1), Some("claude-sonnet-4"), 1_000_000, 0, Some(0.5))];
        let summary = UsageReducer::reduce(Period::year(2025), &FlatPricing, &events);
        assert!((summary.total_cost_usd - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unpriced_model_costs_nothing() {
        let events = vec![event((2025, 1, 1), Some("claude-opus-4"), 1_000_000, 0, None)];
        let summary = UsageReducer::reduce(Period::year(2025), &FlatPricing, &events);
        assert_eq!(summary.total_cost_usd, 0.0);
        assert_eq!(summary.model_tokens.get("claude-opus-4"), Some(1_000_000));
    }

    #[test]
    fn test_tokens_without_model_count_toward_totals_only() {
        let events = vec![event((2025, 1, 1), None, 40, 2, None)];
        let summary = UsageReducer::reduce(Period::year(2025), &FlatPricing, &events);
        assert_eq!(summary.total_tokens, 42);
        assert!(summary.model_tokens.is_empty());
        assert_eq!(summary.total_cost_usd, 0.0);
    }

    #[test]
    fn test_missing_timestamp_is_rejected() {
        let mut e = event((2025, 1, 1), Some("m"), 5, 5, None);
        e.timestamp = None;
        let summary = UsageReducer::reduce(Period::year(2025), &NoPricing, &[e]);
        assert_eq!(summary.event_count, 0);
        assert_eq!(summary.total_tokens, 0);
    }

    #[test]
    fn test_daily_counts_per_local_date() {
        let events = vec![
            event((2025, 4, 2), None, 0, 0, None),
            event((2025, 4, 2), None, 0, 0, None),
            event((2025, 4, 3), None, 0, 0, None),
        ];
        let summary = UsageReducer::reduce(Period::year(2025), &NoPricing, &events);
        let day = |d: u32| chrono::NaiveDate::from_ymd_opt(2025, 4, d).unwrap();
        assert_eq!(summary.daily_activity.get(&day(2)), Some(&2));
        assert_eq!(summary.daily_activity.get(&day(3)), Some(&1));
    }
}
