//! Pricing service for cost estimation
//!
//! Provides per-token unit prices from LiteLLM pricing data. Events that
//! already carry `costUSD` never reach this module; everything else is
//! estimated from token counts, memoized per model for one run.

use crate::services::directory::{ModelDirectory, ModelInfo};
use crate::services::normalizer::{display_name, normalize_model_name};
use crate::types::{Result, TokenCounts, WrappedError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// LiteLLM pricing URL
const LITELLM_PRICING_URL: &str =
    "https://raw.githubusercontent.com/BerriAI/litellm/main/model_prices_and_context_window.json";

/// Cache TTL in seconds (1 hour)
const CACHE_TTL_SECS: i64 = 3600;

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Unit prices for a model
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelPricing {
    #[serde(default)]
    pub input_cost_per_token: Option<f64>,
    #[serde(default)]
    pub output_cost_per_token: Option<f64>,
    #[serde(default)]
    pub cache_read_input_token_cost: Option<f64>,
    #[serde(default)]
    pub cache_creation_input_token_cost: Option<f64>,
    #[serde(default)]
    pub litellm_provider: Option<String>,
}

impl ModelPricing {
    /// Cost of `tokens` at these unit prices (missing prices count as zero)
    pub fn cost(&self, tokens: &TokenCounts) -> f64 {
        let input_cost = self.input_cost_per_token.unwrap_or(0.0);
        let output_cost = self.output_cost_per_token.unwrap_or(0.0);
        let cache_read_cost = self.cache_read_input_token_cost.unwrap_or(0.0);
        let cache_creation_cost = self.cache_creation_input_token_cost.unwrap_or(0.0);

        (tokens.input_tokens as f64 * input_cost)
            + (tokens.cache_read_tokens as f64 * cache_read_cost)
            + (tokens.cache_write_tokens as f64 * cache_creation_cost)
            + (tokens.output_tokens as f64 * output_cost)
    }
}

/// Source of per-token unit prices
pub trait PricingResolver {
    /// Unit prices for `model`, or `None` when the model is unknown
    fn unit_price(&self, model: &str) -> Option<ModelPricing>;
}

/// Resolver that knows no prices and no models
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPricing;

impl PricingResolver for NoPricing {
    fn unit_price(&self, _model: &str) -> Option<ModelPricing> {
        None
    }
}

impl ModelDirectory for NoPricing {
    fn lookup(&self, _model: &str) -> Option<ModelInfo> {
        None
    }
}

/// Run-scoped memo in front of a [`PricingResolver`]
pub struct PricingMemo<'a> {
    resolver: &'a dyn PricingResolver,
    prices: HashMap<String, Option<ModelPricing>>,
}

impl<'a> PricingMemo<'a> {
    pub fn new(resolver: &'a dyn PricingResolver) -> Self {
        Self {
            resolver,
            prices: HashMap::new(),
        }
    }

    /// Estimated cost for `tokens` on `model`; zero when the model has no price
    pub fn estimate(&mut self, model: &str, tokens: &TokenCounts) -> f64 {
        let resolver = self.resolver;
        self.prices
            .entry(model.to_string())
            .or_insert_with(|| resolver.unit_price(model))
            .as_ref()
            .map_or(0.0, |p| p.cost(tokens))
    }

    /// Number of distinct models looked up so far
    pub fn lookups(&self) -> usize {
        self.prices.len()
    }
}

/// Cached pricing data
#[derive(Debug, Serialize, Deserialize)]
pub struct PricingCache {
    /// Unix timestamp when the cache was fetched
    pub fetched_at: i64,
    /// Model pricing data
    pub models: HashMap<String, ModelPricing>,
}

impl PricingCache {
    pub fn is_expired(&self) -> bool {
        now_secs() - self.fetched_at > CACHE_TTL_SECS
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// LiteLLM-backed pricing table
pub struct PricingService {
    cache: PricingCache,
}

impl PricingService {
    /// Load pricing from `cache_path`.
    ///
    /// Online: a missing or expired cache is refreshed from LiteLLM (an expired
    /// cache is still used if the fetch fails). Offline: the on-disk cache is
    /// used as-is, expired or not.
    pub fn load(cache_path: &Path, offline: bool) -> Result<Self> {
        let cache = if offline {
            Self::load_cache(cache_path)?
        } else {
            Self::load_or_fetch_cache(cache_path)?
        };
        debug!(models = cache.models.len(), "pricing table loaded");
        Ok(Self { cache })
    }

    /// Build a service from an in-memory table
    pub fn from_models(models: HashMap<String, ModelPricing>) -> Self {
        Self {
            cache: PricingCache {
                fetched_at: now_secs(),
                models,
            },
        }
    }

    /// Get the default cache path (~/.ccwrapped/pricing.json)
    pub fn default_cache_path() -> Result<PathBuf> {
        let home = directories::UserDirs::new()
            .ok_or_else(|| WrappedError::Pricing("Failed to get home directory".into()))?
            .home_dir()
            .to_path_buf();
        Ok(home.join(".ccwrapped").join("pricing.json"))
    }

    fn load_or_fetch_cache(cache_path: &Path) -> Result<PricingCache> {
        if let Ok(cache) = Self::load_cache(cache_path) {
            if !cache.is_expired() {
                return Ok(cache);
            }
            match Self::fetch_pricing() {
                Ok(fresh) => {
                    Self::save_cache_quietly(cache_path, &fresh);
                    return Ok(fresh);
                }
                Err(e) => {
                    warn!(error = %e, "pricing refresh failed, using expired cache");
                    return Ok(cache);
                }
            }
        }

        let cache = Self::fetch_pricing()
            .map_err(|e| WrappedError::Pricing(format!("Failed to fetch pricing data: {}", e)))?;
        Self::save_cache_quietly(cache_path, &cache);
        Ok(cache)
    }

    fn load_cache(cache_path: &Path) -> Result<PricingCache> {
        let content = fs::read_to_string(cache_path)?;
        let cache: PricingCache = serde_json::from_str(&content)
            .map_err(|e| WrappedError::Pricing(format!("Invalid cache format: {}", e)))?;
        Ok(cache)
    }

    fn save_cache(cache_path: &Path, cache: &PricingCache) -> Result<()> {
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(cache)
            .map_err(|e| WrappedError::Pricing(format!("Serialization failed: {}", e)))?;
        fs::write(cache_path, content)?;
        Ok(())
    }

    fn save_cache_quietly(cache_path: &Path, cache: &PricingCache) {
        if let Err(e) = Self::save_cache(cache_path, cache) {
            warn!(path = %cache_path.display(), error = %e, "could not persist pricing cache");
        }
    }

    /// Fetch pricing data from LiteLLM
    fn fetch_pricing() -> std::result::Result<PricingCache, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("HTTP client error: {}", e))?;

        let response = client
            .get(LITELLM_PRICING_URL)
            .send()
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        // The table has a few non-model entries; keep only rows that parse
        let raw: HashMap<String, serde_json::Value> = response
            .json()
            .map_err(|e| format!("JSON parse error: {}", e))?;
        let models = raw
            .into_iter()
            .filter_map(|(name, v)| serde_json::from_value(v).ok().map(|p| (name, p)))
            .collect();

        Ok(PricingCache {
            fetched_at: now_secs(),
            models,
        })
    }

    /// Get pricing for a model (tries exact match first, then normalized)
    pub fn get_pricing(&self, model: &str) -> Option<&ModelPricing> {
        if let Some(pricing) = self.cache.models.get(model) {
            return Some(pricing);
        }
        let normalized = normalize_model_name(model);
        if normalized != model {
            return self.cache.models.get(&normalized);
        }
        None
    }

    pub fn model_count(&self) -> usize {
        self.cache.models.len()
    }
}

impl PricingResolver for PricingService {
    fn unit_price(&self, model: &str) -> Option<ModelPricing> {
        self.get_pricing(model).cloned()
    }
}

impl ModelDirectory for PricingService {
    fn lookup(&self, model: &str) -> Option<ModelInfo> {
        let pricing = self.get_pricing(model)?;
        let provider = pricing.litellm_provider.clone()?;
        Some(ModelInfo {
            display_name: display_name(model),
            provider,
        })
    }
}
