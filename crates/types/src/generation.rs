//! Generation results and per-attempt diagnostics.

use serde::{Deserialize, Serialize};

/// Token counts reported by a provider for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    #[must_use]
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A successful completion returned by a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Trimmed completion text.
    pub output: String,
    /// Token counts, when the provider response carried them.
    pub usage: Option<TokenUsage>,
}

/// One provider attempt within a dispatch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationAttempt {
    pub provider: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl GenerationAttempt {
    #[must_use]
    pub fn succeeded(provider: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            success: true,
            output: Some(output.into()),
            error_message: None,
        }
    }

    #[must_use]
    pub fn failed(provider: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            success: false,
            output: None,
            error_message: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_total() {
        assert_eq!(TokenUsage::new(120, 380).total(), 500);
        assert_eq!(TokenUsage::default().total(), 0);
        assert_eq!(TokenUsage::new(u64::MAX, 1).total(), u64::MAX);
    }

    #[test]
    fn test_failed_attempt_skips_output() {
        let attempt = GenerationAttempt::failed("groq", "HTTP 503");
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("output").is_none());
        assert_eq!(json["error_message"], "HTTP 503");
    }
}
