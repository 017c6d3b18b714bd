//! Source locator: finds Claude data roots and the persisted stats cache

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding one or more comma-separated data roots
pub const CLAUDE_CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

const PROJECTS_DIR_NAME: &str = "projects";
const STATS_CACHE_FILE_NAME: &str = "stats-cache.json";

/// Resolves data roots from an override list, else from default locations.
///
/// Candidates are canonicalized and deduplicated, so two spellings of the
/// same directory are only considered once.
#[derive(Debug, Clone)]
pub struct SourceLocator {
    overrides: Vec<PathBuf>,
    defaults: Vec<PathBuf>,
}

impl SourceLocator {
    /// Locator with the default candidates (~/.config/claude, then ~/.claude)
    pub fn new(override_paths: Option<&str>) -> Self {
        Self::with_candidates(override_paths, default_candidates())
    }

    pub fn with_candidates(override_paths: Option<&str>, defaults: Vec<PathBuf>) -> Self {
        let overrides = override_paths
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            overrides: canonical_unique(overrides),
            defaults: canonical_unique(defaults),
        }
    }

    /// `projects/` directories holding raw session logs.
    ///
    /// Every override with a `projects/` directory, or if none qualifies,
    /// the first default that has one. Empty when nothing exists.
    pub fn project_dirs(&self) -> Vec<PathBuf> {
        let with_projects = |base: &PathBuf| {
            let dir = base.join(PROJECTS_DIR_NAME);
            dir.is_dir().then_some(dir)
        };

        let mut found: Vec<PathBuf> = self.overrides.iter().filter_map(with_projects).collect();
        if found.is_empty() {
            found.extend(self.defaults.iter().find_map(with_projects));
        }
        if !found.is_empty() {
            debug!(roots = ?found, "resolved project directories");
        }
        found
    }

    /// First candidate's `stats-cache.json` that exists (overrides first)
    pub fn stats_cache_path(&self) -> Option<PathBuf> {
        self.overrides
            .iter()
            .chain(self.defaults.iter())
            .map(|base| base.join(STATS_CACHE_FILE_NAME))
            .find(|p| p.is_file())
    }
}

fn default_candidates() -> Vec<PathBuf> {
    match directories::BaseDirs::new() {
        Some(home) => vec![
            home.config_dir().join("claude"),
            home.home_dir().join(".claude"),
        ],
        None => {
            debug!("could not determine home directory");
            Vec::new()
        }
    }
}

fn canonical_unique(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .map(|p| canonical(&p))
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// Canonical form when the path exists, the path itself otherwise
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_root(parent: &Path, name: &str, projects: bool, cache: bool) -> PathBuf {
        let root = parent.join(name);
        fs::create_dir_all(&root).unwrap();
        if projects {
            fs::create_dir_all(root.join("projects")).unwrap();
        }
        if cache {
            fs::write(root.join("stats-cache.json"), "{}").unwrap();
        }
        root
    }

    #[test]
    fn test_no_candidates_is_empty_not_error() {
        let temp = TempDir::new().unwrap();
        let locator =
            SourceLocator::with_candidates(None, vec![temp.path().join("missing")]);
        assert!(locator.project_dirs().is_empty());
        assert!(locator.stats_cache_path().is_none());
    }

    #[test]
    fn test_defaults_in_order() {
        let temp = TempDir::new().unwrap();
        let first = make_root(temp.path(), "config-claude", true, false);
        let second = make_root(temp.path(), "dot-claude", true, true);

        let locator = SourceLocator::with_candidates(None, vec![first.clone(), second.clone()]);
        assert_eq!(locator.project_dirs(), vec![canonical(&first).join("projects")]);
        assert_eq!(
            locator.stats_cache_path(),
            Some(canonical(&second).join("stats-cache.json"))
        );
    }

    #[test]
    fn test_first_default_with_projects_wins() {
        let temp = TempDir::new().unwrap();
        let bare = make_root(temp.path(), "config-claude", false, false);
        let second = make_root(temp.path(), "dot-claude", true, false);

        let locator = SourceLocator::with_candidates(None, vec![bare, second.clone()]);
        assert_eq!(locator.project_dirs(), vec![canonical(&second).join("projects")]);
    }

    #[test]
    fn test_override_takes_priority() {
        let temp = TempDir::new().unwrap();
        let default = make_root(temp.path(), "default", true, true);
        let custom = make_root(temp.path(), "custom", true, true);

        let raw = custom.to_string_lossy().to_string();
        let locator = SourceLocator::with_candidates(Some(&raw), vec![default]);
        assert_eq!(locator.project_dirs(), vec![canonical(&custom).join("projects")]);
        assert_eq!(
            locator.stats_cache_path(),
            Some(canonical(&custom).join("stats-cache.json"))
        );
    }

    #[test]
    fn test_invalid_override_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let default = make_root(temp.path(), "default", true, false);
        let bogus = temp.path().join("nope").to_string_lossy().to_string();

        let locator = SourceLocator::with_candidates(Some(&bogus), vec![default.clone()]);
        assert_eq!(locator.project_dirs(), vec![canonical(&default).join("projects")]);
    }

    #[test]
    fn test_comma_separated_overrides_are_deduplicated() {
        let temp = TempDir::new().unwrap();
        let a = make_root(temp.path(), "a", true, false);
        let b = make_root(temp.path(), "b", true, false);
        // Same directory spelled two ways, plus blanks
        let dotted = a.join("..").join("a");
        let raw = format!(
            "{}, {} ,,{}",
            a.display(),
            dotted.display(),
            b.display()
        );

        let locator = SourceLocator::with_candidates(Some(&raw), Vec::new());
        let dirs = locator.project_dirs();
        assert_eq!(dirs.len(), 2);
        assert_eq!(dirs[0], canonical(&a).join("projects"));
        assert_eq!(dirs[1], canonical(&b).join("projects"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_override_is_deduplicated() {
        let temp = TempDir::new().unwrap();
        let real = make_root(temp.path(), "real", true, false);
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let raw = format!("{},{}", real.display(), link.display());
        let locator = SourceLocator::with_candidates(Some(&raw), Vec::new());
        assert_eq!(locator.project_dirs().len(), 1);
    }
}
