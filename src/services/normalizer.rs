//! Model name normalization service
//!
//! Canonical model ids for pricing lookup, human-readable display names,
//! and provider attribution by name prefix.

/// Normalize a model name to canonical form.
///
/// - Dots to hyphens: "claude-opus-4.5" → "claude-opus-4-5"
/// - Remove date suffix: "claude-opus-4-5-20251101" → "claude-opus-4-5"
///
/// # Examples
/// ```
/// use ccwrapped::services::normalizer::normalize_model_name;
///
/// assert_eq!(normalize_model_name("claude-opus-4-5-20251101"), "claude-opus-4-5");
/// assert_eq!(normalize_model_name("claude-opus-4.5"), "claude-opus-4-5");
/// ```
pub fn normalize_model_name(model: &str) -> String {
    let normalized = model.trim().replace('.', "-");

    // Pattern: ends with -YYYYMMDD where YYYYMMDD is 8 digits starting with 20
    if let Some(suffix_start) = normalized.rfind('-') {
        let suffix = &normalized[suffix_start + 1..];
        if suffix.len() == 8
            && suffix.starts_with("20")
            && suffix.chars().all(|c| c.is_ascii_digit())
        {
            return normalized[..suffix_start].to_string();
        }
    }

    normalized
}

/// Human-readable label for a model id.
///
/// "claude-sonnet-4-5-20250929" → "Claude Sonnet 4.5", "gemini-2.5-pro" → "Gemini 2.5 Pro"
pub fn display_name(model: &str) -> String {
    let normalized = normalize_model_name(model);
    let mut words: Vec<String> = Vec::new();
    let mut version: Vec<&str> = Vec::new();

    for part in normalized.split('-').filter(|p| !p.is_empty()) {
        if part.chars().all(|c| c.is_ascii_digit()) {
            version.push(part);
            continue;
        }
        if !version.is_empty() {
            words.push(version.join("."));
            version.clear();
        }
        words.push(capitalize(part));
    }
    if !version.is_empty() {
        words.push(version.join("."));
    }

    // "GPT 4o" reads wrong; vendors write "GPT-4o"
    if words.len() >= 2 && words[0] == "GPT" {
        let rest = words.split_off(1);
        let head = format!("GPT-{}", rest[0]);
        words = std::iter::once(head).chain(rest.into_iter().skip(1)).collect();
    }

    words.join(" ")
}

fn capitalize(word: &str) -> String {
    if word.eq_ignore_ascii_case("gpt") {
        return "GPT".to_string();
    }
    if !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Provider id guessed from the model name; "unknown" when nothing matches
pub fn infer_provider(model: &str) -> &'static str {
    let lower = model.trim().to_ascii_lowercase();
    if lower.starts_with("claude") {
        "anthropic"
    } else if ["gpt", "o1", "o3", "o4", "codex"]
        .iter()
        .any(|p| lower.starts_with(p))
    {
        "openai"
    } else if lower.starts_with("gemini") {
        "google"
    } else {
        "unknown"
    }
}

/// Display label for a provider id
pub fn provider_display_name(provider: &str) -> String {
    match provider {
        "anthropic" => "Anthropic".to_string(),
        "openai" => "OpenAI".to_string(),
        "google" | "gemini" | "vertex_ai" => "Google".to_string(),
        "unknown" => "Unknown".to_string(),
        other => capitalize(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== normalize_model_name ==========

    #[test]
    fn test_dot_to_hyphen() {
        assert_eq!(normalize_model_name("claude-opus-4.5"), "claude-opus-4-5");
        assert_eq!(normalize_model_name("model-1.2.3"), "model-1-2-3");
    }

    #[test]
    fn test_remove_date_suffix() {
        assert_eq!(
            normalize_model_name("claude-sonnet-4-20250514"),
            "claude-sonnet-4"
        );
        assert_eq!(
            normalize_model_name("claude-opus-4.5-20251101"),
            "claude-opus-4-5"
        );
    }

    #[test]
    fn test_no_op_cases() {
        assert_eq!(normalize_model_name("claude-opus-4-5"), "claude-opus-4-5");
        assert_eq!(normalize_model_name("gpt-4o"), "gpt-4o");
        assert_eq!(normalize_model_name(""), "");
        assert_eq!(
            normalize_model_name("model-12345678-extra"),
            "model-12345678-extra"
        );
        assert_eq!(normalize_model_name("20251101-claude"), "20251101-claude");
    }

    // ========== display_name ==========

    #[test]
    fn test_display_name_claude() {
        assert_eq!(
            display_name("claude-sonnet-4-5-20250929"),
            "Claude Sonnet 4.5"
        );
        assert_eq!(display_name("claude-opus-4-20250514"), "Claude Opus 4");
        assert_eq!(display_name("claude-3-5-haiku"), "Claude 3.5 Haiku");
    }

    #[test]
    fn test_display_name_other_vendors() {
        assert_eq!(display_name("gemini-2.5-pro"), "Gemini 2.5 Pro");
        assert_eq!(display_name("gpt-4o"), "GPT-4o");
        assert_eq!(display_name("gpt-5-codex"), "GPT-5 Codex");
        assert_eq!(display_name("o3"), "o3");
    }

    #[test]
    fn test_display_name_empty() {
        assert_eq!(display_name(""), "");
    }

    // ========== infer_provider ==========

    #[test]
    fn test_infer_provider() {
        assert_eq!(infer_provider("claude-sonnet-4"), "anthropic");
        assert_eq!(infer_provider("Claude-Opus"), "anthropic");
        assert_eq!(infer_provider("gpt-4o"), "openai");
        assert_eq!(infer_provider("o3-mini"), "openai");
        assert_eq!(infer_provider("gemini-2.5-pro"), "google");
        assert_eq!(infer_provider("llama-3"), "unknown");
    }

    #[test]
    fn test_provider_display_name() {
        assert_eq!(provider_display_name("anthropic"), "Anthropic");
        assert_eq!(provider_display_name("openai"), "OpenAI");
        assert_eq!(provider_display_name("mistral"), "Mistral");
        assert_eq!(provider_display_name("unknown"), "Unknown");
    }
}
