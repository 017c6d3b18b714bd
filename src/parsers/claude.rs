//! Claude Code JSONL parser

use crate::types::{RawEvent, Result, TokenCounts, WrappedError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use super::LogParser;

/// Model id Claude Code writes for locally generated (unbilled) replies
const SYNTHETIC_MODEL: &str = "<synthetic>";

/// Claude Code JSONL line structure
#[derive(Deserialize)]
struct ClaudeJsonLine {
    timestamp: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    #[serde(rename = "requestId")]
    request_id: Option<String>,
    message: Option<ClaudeMessage>,
    #[serde(rename = "costUSD", default, deserialize_with = "lenient_f64")]
    cost_usd: Option<f64>,
}

#[derive(Deserialize)]
struct ClaudeMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    model: Option<String>,
    id: Option<String>,
    usage: Option<ClaudeUsage>,
    content: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ClaudeUsage {
    #[serde(default, deserialize_with = "lenient_count")]
    input_tokens: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    output_tokens: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    cache_creation_input_tokens: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    cache_read_input_tokens: u64,
}

/// Token counts: anything that is not a finite non-negative number counts as zero
fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.as_ref().map_or(0, |v| {
        v.as_u64().unwrap_or_else(|| {
            v.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map_or(0, |f| f as u64)
        })
    }))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value
        .and_then(|v| v.as_f64())
        .filter(|f| f.is_finite()))
}

fn lenient_string<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }))
}

fn count_tool_calls(content: Option<&serde_json::Value>) -> u64 {
    match content {
        Some(serde_json::Value::Array(blocks)) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
            .count() as u64,
        _ => 0,
    }
}

/// Parser for Claude Code session logs
#[derive(Debug, Default, Clone, Copy)]
pub struct ClaudeLogParser;

impl ClaudeLogParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a single JSONL line. Returns `None` only when the line is not a JSON object.
    fn parse_line(&self, line: &mut [u8]) -> Option<RawEvent> {
        if line.is_empty() {
            return None;
        }

        let data: ClaudeJsonLine = simd_json::from_slice(line).ok()?;

        let timestamp = data.timestamp.as_deref().and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(_) => {
                    debug!(timestamp = raw, "unparseable timestamp");
                    None
                }
            }
        });

        let (model, usage, message_id, tool_calls) = match data.message {
            Some(message) => {
                let tool_calls = count_tool_calls(message.content.as_ref());
                // Synthetic replies never hit the API: no model, no usage
                if message.model.as_deref() == Some(SYNTHETIC_MODEL) {
                    (None, None, message.id, tool_calls)
                } else {
                    let usage = message.usage.map(|u| TokenCounts {
                        input_tokens: u.input_tokens,
                        output_tokens: u.output_tokens,
                        cache_read_tokens: u.cache_read_input_tokens,
                        cache_write_tokens: u.cache_creation_input_tokens,
                    });
                    (message.model, usage, message.id, tool_calls)
                }
            }
            None => (None, None, None, 0),
        };

        Some(RawEvent {
            timestamp,
            session_id: data.session_id,
            model,
            usage,
            cost_usd: data.cost_usd,
            message_id,
            request_id: data.request_id,
            tool_calls,
        })
    }
}

impl LogParser for ClaudeLogParser {
    fn name(&self) -> &str {
        "claude-code"
    }

    fn file_pattern(&self) -> &str {
        "**/*.jsonl"
    }

    fn parse_file(&self, path: &Path) -> Result<Vec<RawEvent>> {
        let file = File::open(path).map_err(WrappedError::Io)?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();

        // Stream line-by-line to avoid loading entire file into memory
        for line_result in reader.lines() {
            let line = match line_result {
                Ok(l) => l,
                Err(_) => continue, // Skip lines with read errors
            };

            if line.trim().is_empty() {
                continue;
            }

            // Convert to mutable bytes for simd-json
            let mut line_bytes = line.into_bytes();
            if let Some(event) = self.parse_line(&mut line_bytes) {
                events.push(event);
            }
        }

        Ok(events)
    }
}
