//! Key validation verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse status of a provider key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Valid,
    Invalid,
    /// Nothing was supplied, or nothing is stored.
    Missing,
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::Invalid => f.write_str("invalid"),
            Self::Missing => f.write_str("missing"),
        }
    }
}

/// Outcome of validating a candidate key against a provider rule.
///
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
    pub status: KeyStatus,
    pub provider_label: String,
}

impl ValidationResult {
    #[must_use]
    pub fn valid(label: impl Into<String>) -> Self {
        let provider_label = label.into();
        Self {
            valid: true,
            message: format!("{provider_label} API key format looks valid."),
            status: KeyStatus::Valid,
            provider_label,
        }
    }

    #[must_use]
    pub fn invalid(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            status: KeyStatus::Invalid,
            provider_label: label.into(),
        }
    }

    #[must_use]
    pub fn missing(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            status: KeyStatus::Missing,
            provider_label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_status() {
        assert_eq!(ValidationResult::valid("OpenAI").status, KeyStatus::Valid);
        assert!(ValidationResult::valid("OpenAI").valid);
        let bad = ValidationResult::invalid("Groq", "too short");
        assert!(!bad.valid);
        assert_eq!(bad.status, KeyStatus::Invalid);
        assert_eq!(bad.message, "too short");
        assert_eq!(
            ValidationResult::missing("Cohere", "none").status,
            KeyStatus::Missing
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(ValidationResult::missing("Groq", "x")).unwrap();
        assert_eq!(json["status"], "missing");
        assert_eq!(json["provider_label"], "Groq");
    }
}
