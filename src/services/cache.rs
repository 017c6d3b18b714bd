//! Stats cache reader
//!
//! Loads the rollup Claude Code persists next to its session logs. The file
//! is read-only here; it supplements the live scan when raw logs are gone.

use crate::types::{Result, StatsCache, WrappedError};
use fs2::FileExt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::{debug, warn};

pub struct StatsCacheReader;

impl StatsCacheReader {
    /// Load the cache at `path`.
    ///
    /// No path or no file is `Ok(None)`. A file that is not a JSON object of
    /// the expected shape is a hard `WrappedError::Cache`.
    pub fn load(path: Option<&Path>) -> Result<Option<StatsCache>> {
        let Some(path) = path else {
            return Ok(None);
        };

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stats cache");
                return Ok(None);
            }
            Err(e) => return Err(WrappedError::Io(e)),
        };

        // Shared lock so a concurrent writer never hands us half a file
        if let Err(e) = FileExt::lock_shared(&file) {
            warn!(error = %e, "could not lock stats cache, reading unlocked");
        }

        let mut content = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut content);
        let _ = FileExt::unlock(&file);
        read?;

        Self::parse(&content).map(Some)
    }

    pub fn parse(content: &str) -> Result<StatsCache> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| WrappedError::Cache(format!("Corrupted stats cache: {}", e)))?;
        if !value.is_object() {
            return Err(WrappedError::Cache(
                "Stats cache must be a JSON object".into(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| WrappedError::Cache(format!("Unexpected stats cache shape: {}", e)))
    }
}
