//! Account identity and the account-name validator.

use serde::{Deserialize, Serialize};

/// A closed set of supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Anthropic Claude.
    Claude,
    /// OpenAI Codex/GPT.
    Codex,
    /// Google Gemini.
    Gemini,
    /// Moonshot Kimi.
    Kimi,
    /// GitHub Copilot.
    Copilot,
}

/// Identity a human attaches to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account name, validated by [`validate_account_name`].
    pub name: String,
    /// Backing LLM provider.
    pub provider: Provider,
    /// Per-account configuration directory.
    pub config_dir: String,
    /// Display color/label, e.g. `"#4C9AFF"`.
    pub label: Option<String>,
    /// Optional quota policy override (provider-specific, opaque here).
    pub quota_override: Option<String>,
}

/// Validates an account name against `^[A-Za-z0-9][A-Za-z0-9_-]{0,62}$`.
#[must_use]
pub fn validate_account_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphanumeric() {
        return false;
    }
    let rest: Vec<char> = chars.collect();
    if rest.len() > 62 {
        return false;
    }
    rest.iter()
        .all(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_names() {
        assert!(validate_account_name("alice"));
        assert!(validate_account_name("bob-2"));
        assert!(validate_account_name("a"));
    }

    #[test]
    fn rejects_empty_and_bad_start() {
        assert!(!validate_account_name(""));
        assert!(!validate_account_name("-bob"));
        assert!(!validate_account_name("_bob"));
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(!validate_account_name("bob smith"));
        assert!(!validate_account_name("bob@x"));
    }

    #[test]
    fn rejects_too_long() {
        let name = "a".repeat(64);
        assert!(!validate_account_name(&name));
        let name = "a".repeat(63);
        assert!(validate_account_name(&name));
    }
}
