//! Per-provider key format rules.
//!
//! Validation is pure: the same `(secret, provider)` pair always produces the
//! same [`ValidationResult`]. Checks run in a fixed order so the message names
//! the most specific problem: empty, masked, length, prefix, pattern.

use novax_types::{ProviderId, ValidationResult};
use regex::Regex;
use std::sync::LazyLock;

const MASK_CHARS: [char; 2] = ['•', '*'];

/// Structural expectations for one provider's keys.
#[derive(Debug, Clone)]
pub struct Rule {
    /// `None` for the permissive rule applied to unmapped providers.
    pub provider: Option<ProviderId>,
    pub label: String,
    pub prefix: Option<&'static str>,
    pub pattern: Regex,
    /// Inclusive bounds, counted in characters.
    pub min_len: usize,
    pub max_len: usize,
    pub enabled: bool,
}

struct Spec {
    provider: ProviderId,
    prefix: Option<&'static str>,
    pattern: &'static str,
    min_len: usize,
    max_len: usize,
}

// Registration order: `sk-ant-` must be tried before the broader `sk-`.
const BUILTIN: &[Spec] = &[
    Spec {
        provider: ProviderId::Anthropic,
        prefix: Some("sk-ant-"),
        pattern: r"^sk-ant-[A-Za-z0-9_-]{20,}$",
        min_len: 30,
        max_len: 200,
    },
    Spec {
        provider: ProviderId::OpenAI,
        prefix: Some("sk-"),
        pattern: r"^sk-[A-Za-z0-9_-]{20,}$",
        min_len: 23,
        max_len: 200,
    },
    Spec {
        provider: ProviderId::Groq,
        prefix: Some("gsk_"),
        pattern: r"^gsk_[A-Za-z0-9]{20,}$",
        min_len: 24,
        max_len: 100,
    },
    Spec {
        provider: ProviderId::Gemini,
        prefix: Some("AIza"),
        pattern: r"^AIza[0-9A-Za-z_-]{35}$",
        min_len: 39,
        max_len: 39,
    },
    Spec {
        provider: ProviderId::Mistral,
        prefix: None,
        pattern: r"^[A-Za-z0-9]{32}$",
        min_len: 32,
        max_len: 32,
    },
    Spec {
        provider: ProviderId::Cohere,
        prefix: None,
        pattern: r"^[A-Za-z0-9]{40}$",
        min_len: 40,
        max_len: 40,
    },
];

static BUILTIN_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    BUILTIN
        .iter()
        .map(|s| Rule {
            provider: Some(s.provider),
            label: s.provider.label().to_string(),
            prefix: s.prefix,
            pattern: Regex::new(s.pattern).expect("built-in key pattern compiles"),
            min_len: s.min_len,
            max_len: s.max_len,
            enabled: true,
        })
        .collect()
});

static CUSTOM_RULE: LazyLock<Rule> = LazyLock::new(|| Rule {
    provider: None,
    label: "Custom".to_string(),
    prefix: None,
    pattern: Regex::new(r"^[A-Za-z0-9_-]+$").expect("custom key pattern compiles"),
    min_len: 20,
    max_len: 128,
    enabled: true,
});

/// Returns `true` if the value contains a bullet or asterisk anywhere.
///
/// Masked display placeholders must never be treated as real input.
#[must_use]
pub fn looks_masked(secret: &str) -> bool {
    secret.contains(MASK_CHARS)
}

/// The ordered rule table consulted by the vault and the key entry points.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: BUILTIN_RULES.clone(),
        }
    }
}

impl RuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks providers not listed in `enabled` as disabled.
    #[must_use]
    pub fn with_enabled(mut self, enabled: &[ProviderId]) -> Self {
        for rule in &mut self.rules {
            rule.enabled = rule.provider.is_some_and(|p| enabled.contains(&p));
        }
        self
    }

    /// Rule for `provider`, or the permissive custom rule when none is mapped.
    #[must_use]
    pub fn rule_for(&self, provider: ProviderId) -> &Rule {
        self.rules
            .iter()
            .find(|r| r.provider == Some(provider))
            .unwrap_or(&*CUSTOM_RULE)
    }

    /// Validates `secret` against `provider`'s rule.
    #[must_use]
    pub fn validate(&self, secret: &str, provider: ProviderId) -> ValidationResult {
        check(secret, self.rule_for(provider))
    }

    /// Validates against the permissive rule used for unmapped providers.
    #[must_use]
    pub fn validate_custom(secret: &str) -> ValidationResult {
        check(secret, &CUSTOM_RULE)
    }

    /// Best-effort guess of which provider issued `secret`.
    ///
    /// Tries each enabled rule's pattern in registration order. Not suitable
    /// for security decisions.
    #[must_use]
    pub fn detect_provider(&self, secret: &str) -> Option<ProviderId> {
        let secret = secret.trim();
        if secret.is_empty() || looks_masked(secret) {
            return None;
        }
        self.rules
            .iter()
            .filter(|r| r.enabled)
            .find(|r| r.pattern.is_match(secret))
            .and_then(|r| r.provider)
    }
}

fn check(secret: &str, rule: &Rule) -> ValidationResult {
    let label = rule.label.as_str();
    let secret = secret.trim();

    if secret.is_empty() {
        return ValidationResult::missing(label, format!("{label} API key cannot be empty."));
    }
    if looks_masked(secret) {
        return ValidationResult::invalid(
            label,
            "Masked API key values cannot be validated. Enter the full key.",
        );
    }

    let len = secret.chars().count();
    if len < rule.min_len || len > rule.max_len {
        let message = if rule.min_len == rule.max_len {
            format!(
                "{label} API key must be exactly {} characters (got {len}).",
                rule.min_len
            )
        } else {
            format!(
                "{label} API key must be between {} and {} characters (got {len}).",
                rule.min_len, rule.max_len
            )
        };
        return ValidationResult::invalid(label, message);
    }

    if let Some(prefix) = rule.prefix
        && !secret.starts_with(prefix)
    {
        return ValidationResult::invalid(
            label,
            format!("{label} API key must start with \"{prefix}\"."),
        );
    }

    if !rule.pattern.is_match(secret) {
        return ValidationResult::invalid(
            label,
            format!("{label} API key contains invalid characters or has an unexpected format."),
        );
    }

    ValidationResult::valid(label)
}
