//! Log scanning and parsing for AI CLI session logs

mod claude;

pub use claude::ClaudeLogParser;

use crate::types::{RawEvent, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Trait for parsing structured session logs
pub trait LogParser: Send + Sync {
    /// Parser name (e.g., "claude-code")
    fn name(&self) -> &str;

    /// Glob pattern for finding log files under a root (e.g., "**/*.jsonl")
    fn file_pattern(&self) -> &str;

    /// Parse a single file line by line. Malformed lines are skipped.
    fn parse_file(&self, path: &Path) -> Result<Vec<RawEvent>>;

    /// Recursively collect every log file under `root`
    fn collect_files(&self, root: &Path) -> Vec<PathBuf> {
        let escaped = glob::Pattern::escape(&root.to_string_lossy());
        let pattern = Path::new(&escaped).join(self.file_pattern());
        glob::glob(&pattern.to_string_lossy())
            .map(|paths| {
                paths
                    .filter_map(|e| e.ok())
                    .filter(|p| p.is_file())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parse every file under every root in parallel, then deduplicate.
    ///
    /// Results keep file order, so the first copy of a duplicate always wins.
    fn scan(&self, roots: &[PathBuf]) -> Vec<RawEvent> {
        let files: Vec<PathBuf> = roots
            .iter()
            .flat_map(|root| self.collect_files(root))
            .collect();
        debug!(parser = self.name(), files = files.len(), "scanning log files");

        let per_file: Vec<Vec<RawEvent>> = files
            .par_iter()
            .map(|f| match self.parse_file(f) {
                Ok(events) => events,
                Err(e) => {
                    warn!(path = %f.display(), error = %e, "skipping unreadable log file");
                    Vec::new()
                }
            })
            .collect();

        dedup_events(per_file.into_iter().flatten())
    }
}

/// Drop records whose identity key was already seen. Records without a key are always kept.
pub fn dedup_events(events: impl IntoIterator<Item = RawEvent>) -> Vec<RawEvent> {
    let mut seen: HashSet<String> = HashSet::new();
    events
        .into_iter()
        .filter(|event| match event.dedup_hash() {
            Some(hash) => seen.insert(hash),
            None => true,
        })
        .collect()
}
