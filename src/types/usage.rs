//! Usage types for event ingestion and live aggregation

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Four token categories reported by a usage block
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenCounts {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

impl TokenCounts {
    pub fn total(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_read_tokens)
            .saturating_add(self.cache_write_tokens)
    }

    pub fn add(&mut self, other: &TokenCounts) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(other.cache_read_tokens);
        self.cache_write_tokens = self
            .cache_write_tokens
            .saturating_add(other.cache_write_tokens);
    }
}

/// One logged interaction, validated at the ingestion boundary.
///
/// `timestamp` stays optional here: dedup runs before timestamp validation,
/// so a record with a broken timestamp still claims its identity key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEvent {
    pub timestamp: Option<DateTime<Utc>>,
    pub session_id: Option<String>,
    pub model: Option<String>,
    pub usage: Option<TokenCounts>,
    pub cost_usd: Option<f64>,
    pub message_id: Option<String>,
    pub request_id: Option<String>,
    pub tool_calls: u64,
}

impl RawEvent {
    /// Local calendar date of the event, if it has a timestamp
    pub fn local_date(&self) -> Option<NaiveDate> {
        self.timestamp
            .map(|ts| ts.with_timezone(&Local).date_naive())
    }

    /// Identity key built from message id and request id; both are required
    pub fn dedup_hash(&self) -> Option<String> {
        match (&self.message_id, &self.request_id) {
            (Some(msg), Some(req)) => Some(format!("{}:{}", msg, req)),
            _ => None,
        }
    }
}

/// Per-model token totals that remember first-encounter order.
///
/// Rankings break ties by encounter order, so a plain `HashMap` is not enough.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTokenMap {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl ModelTokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, model: &str, tokens: u64) {
        match self.index.get(model) {
            Some(&i) => {
                self.entries[i].1 = self.entries[i].1.saturating_add(tokens);
            }
            None => {
                self.index.insert(model.to_string(), self.entries.len());
                self.entries.push((model.to_string(), tokens));
            }
        }
    }

    pub fn get(&self, model: &str) -> Option<u64> {
        self.index.get(model).map(|&i| self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(m, t)| (m.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |acc, (_, t)| acc.saturating_add(*t))
    }
}

impl<S: AsRef<str>> FromIterator<(S, u64)> for ModelTokenMap {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (model, tokens) in iter {
            map.add(model.as_ref(), tokens);
        }
        map
    }
}

/// Live recomputation from raw logs for one period
#[derive(Debug, Clone, Default)]
pub struct UsageSummary {
    pub daily_activity: BTreeMap<NaiveDate, u64>,
    pub model_tokens: ModelTokenMap,
    pub tokens: TokenCounts,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub sessions: HashSet<String>,
    pub earliest: Option<DateTime<Utc>>,
    pub event_count: u64,
    pub tool_calls: u64,
}

impl UsageSummary {
    /// True when any token scalar is nonzero
    pub fn has_token_signal(&self) -> bool {
        self.total_tokens > 0
            || self.tokens.input_tokens > 0
            || self.tokens.output_tokens > 0
            || self.tokens.cache_read_tokens > 0
            || self.tokens.cache_write_tokens > 0
    }
}
