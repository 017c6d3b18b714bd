//! Model → display name / provider attribution

use crate::services::normalizer::{display_name, infer_provider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub display_name: String,
    pub provider: String,
}

/// Directory of known models
pub trait ModelDirectory {
    /// Display name and owning provider for `model`, or `None` when unknown
    fn lookup(&self, model: &str) -> Option<ModelInfo>;
}

/// Directory lookup with name-prefix heuristics as fallback
pub fn resolve_model(directory: &dyn ModelDirectory, model: &str) -> ModelInfo {
    match directory.lookup(model) {
        Some(info) if !info.provider.trim().is_empty() => info,
        Some(info) => ModelInfo {
            provider: infer_provider(model).to_string(),
            ..info
        },
        None => ModelInfo {
            display_name: display_name(model),
            provider: infer_provider(model).to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneModel;

    impl ModelDirectory for OneModel {
        fn lookup(&self, model: &str) -> Option<ModelInfo> {
            match model {
                "house-model" => Some(ModelInfo {
                    display_name: "House Model".into(),
                    provider: "acme".into(),
                }),
                "blank-provider" => Some(ModelInfo {
                    display_name: "Blank".into(),
                    provider: " ".into(),
                }),
                _ => None,
            }
        }
    }

    #[test]
    fn test_directory_hit_wins() {
        let info = resolve_model(&OneModel, "house-model");
        assert_eq!(info.provider, "acme");
        assert_eq!(info.display_name, "House Model");
    }

    #[test]
    fn test_miss_falls_back_to_heuristics() {
        let info = resolve_model(&OneModel, "claude-opus-4-20250514");
        assert_eq!(info.provider, "anthropic");
        assert_eq!(info.display_name, "Claude Opus 4");

        let unknown = resolve_model(&OneModel, "mystery");
        assert_eq!(unknown.provider, "unknown");
    }

    #[test]
    fn test_blank_provider_uses_heuristics() {
        let info = resolve_model(&OneModel, "blank-provider");
        assert_eq!(info.display_name, "Blank");
        assert_eq!(info.provider, "unknown");
    }
}
