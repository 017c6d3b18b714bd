//! Final statistics snapshot handed to presentation collaborators

use crate::types::Period;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One row of the top-models / top-providers rankings
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub id: String,
    pub display_name: String,
    pub provider: String,
    pub tokens: u64,
    /// Share of the final merged token total, 0..=100
    pub percentage: f64,
}

/// Fixed-bucket distribution (7 weekdays or 12 months)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub labels: Vec<&'static str>,
    pub counts: Vec<u64>,
    /// Index of the busiest bucket (first wins ties); `None` when all are zero
    pub most_active: Option<usize>,
}

impl Distribution {
    pub fn most_active_label(&self) -> Option<&'static str> {
        self.most_active.map(|i| self.labels[i])
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub count: u64,
    /// 0 = no activity, 1..=4 = quartile of non-zero days
    pub level: u8,
}

/// Which decision-table row supplied an aggregate
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    /// Live recomputation from raw logs
    Live,
    /// Stats cache per-day entries inside the period
    CacheDaily,
    /// Stats cache per-model aggregate records
    CacheModelUsage,
    /// Stats cache per-day entries regardless of period
    CacheAllDays,
    /// Per-model totals split into categories by usage-record ratios
    Apportioned,
    /// No source had signal
    Empty,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub activity: DataSource,
    pub sessions: DataSource,
    pub tool_calls: DataSource,
    pub model_tokens: DataSource,
    pub token_totals: DataSource,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub period: Period,
    pub generated_at: DateTime<Utc>,
    pub has_data: bool,

    pub first_session_date: DateTime<Utc>,
    pub days_since_first_session: i64,

    pub total_sessions: u64,
    pub total_messages: u64,
    pub total_tool_calls: u64,

    pub total_tokens: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cache_read_tokens: u64,
    pub total_cache_write_tokens: u64,
    pub total_cost: f64,
    pub cache_hit_rate: f64,
    pub web_search_requests: u64,
    pub peak_context_window: u64,

    pub models_used: usize,
    pub top_models: Vec<RankingEntry>,
    pub top_providers: Vec<RankingEntry>,

    pub daily_activity: BTreeMap<NaiveDate, u64>,
    pub active_days: usize,
    pub max_streak: u32,
    pub max_streak_days: Vec<NaiveDate>,
    pub current_streak: u32,
    pub most_active_day: Option<DayCount>,
    pub weekday_activity: Distribution,
    pub monthly_activity: Distribution,
    pub heatmap: Vec<HeatmapCell>,

    pub sources: SourceReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_active_label() {
        let dist = Distribution {
            labels: vec!["a", "b", "c"],
            counts: vec![1, 5, 2],
            most_active: Some(1),
        };
        assert_eq!(dist.most_active_label(), Some("b"));

        let empty = Distribution {
            most_active: None,
            ..dist
        };
        assert_eq!(empty.most_active_label(), None);
    }

    #[test]
    fn test_data_source_serializes_kebab_case() {
        let json = serde_json::to_string(&DataSource::CacheModelUsage).unwrap();
        assert_eq!(json, "\"cache-model-usage\"");
    }
}
