//! Shape of the persisted stats cache (`stats-cache.json`)

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsCache {
    pub version: Option<u32>,
    pub last_computed_date: Option<String>,
    pub daily_activity: Vec<CacheDay>,
    pub daily_model_tokens: Vec<CacheDayModelTokens>,
    /// Keyed by model id; iteration (and so ranking ties) is alphabetical
    pub model_usage: BTreeMap<String, CacheModelUsage>,
    pub total_sessions: u64,
    pub total_messages: u64,
    pub first_session_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheDay {
    pub date: String,
    pub message_count: u64,
    pub session_count: u64,
    pub tool_call_count: u64,
}

impl CacheDay {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_cache_date(&self.date)
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheDayModelTokens {
    pub date: String,
    /// Alphabetical by model id, which breaks ties within a day
    pub tokens_by_model: BTreeMap<String, u64>,
}

impl CacheDayModelTokens {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_cache_date(&self.date)
    }
}

/// Aggregate per-model usage record
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheModelUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub web_search_requests: u64,
    #[serde(rename = "costUSD")]
    pub cost_usd: Option<f64>,
    pub context_window: Option<u64>,
}

impl CacheModelUsage {
    pub fn component_sum(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_read_input_tokens)
            .saturating_add(self.cache_creation_input_tokens)
    }
}

/// Accepts `YYYY-MM-DD` and full RFC 3339 timestamps (date part only)
pub fn parse_cache_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_cache() {
        let json = r#"{
            "version": 2,
            "lastComputedDate": "2025-03-02",
            "dailyActivity": [
                {"date": "2025-03-01", "messageCount": 12, "sessionCount": 2, "toolCallCount": 4}
            ],
            "dailyModelTokens": [
                {"date": "2025-03-01", "tokensByModel": {"claude-sonnet-4-5-20250929": 900}}
            ],
            "modelUsage": {
                "claude-sonnet-4-5-20250929": {
                    "inputTokens": 100,
                    "outputTokens": 200,
                    "cacheReadInputTokens": 500,
                    "cacheCreationInputTokens": 100,
                    "webSearchRequests": 3,
                    "costUSD": 1.25,
                    "contextWindow": 200000
                }
            },
            "totalSessions": 2,
            "totalMessages": 12,
            "firstSessionDate": "2025-03-01T09:00:00.000Z"
        }"#;

        let cache: StatsCache = serde_json::from_str(json).unwrap();
        assert_eq!(cache.version, Some(2));
        assert_eq!(cache.daily_activity.len(), 1);
        assert_eq!(cache.daily_activity[0].tool_call_count, 4);
        assert_eq!(
            cache.daily_model_tokens[0]
                .tokens_by_model
                .get("claude-sonnet-4-5-20250929"),
            Some(&900)
        );
        let usage = &cache.model_usage["claude-sonnet-4-5-20250929"];
        assert_eq!(usage.component_sum(), 900);
        assert_eq!(usage.cost_usd, Some(1.25));
        assert_eq!(usage.context_window, Some(200000));
    }

    #[test]
    fn test_missing_fields_default() {
        let cache: StatsCache = serde_json::from_str("{}").unwrap();
        assert_eq!(cache, StatsCache::default());

        let usage: CacheModelUsage = serde_json::from_str(r#"{"inputTokens": 5}"#).unwrap();
        assert_eq!(usage.input_tokens, 5);
        assert_eq!(usage.cost_usd, None);
    }

    #[test]
    fn test_parse_cache_date() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 10);
        assert_eq!(parse_cache_date("2025-01-10"), expected);
        assert_eq!(parse_cache_date("2025-01-10T08:30:00.000Z"), expected);
        assert_eq!(parse_cache_date("garbage"), None);
        assert_eq!(parse_cache_date(""), None);
    }
}
