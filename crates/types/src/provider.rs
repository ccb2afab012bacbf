//! Provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a supported upstream chat-completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAI,
    Anthropic,
    Groq,
    Mistral,
    Gemini,
    Cohere,
}

impl ProviderId {
    /// Returns all known provider variants in their canonical order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::OpenAI,
            Self::Anthropic,
            Self::Groq,
            Self::Mistral,
            Self::Gemini,
            Self::Cohere,
        ]
    }

    /// The lowercase slug used in configuration, storage keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Groq => "groq",
            Self::Mistral => "mistral",
            Self::Gemini => "gemini",
            Self::Cohere => "cohere",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic Claude",
            Self::Groq => "Groq",
            Self::Mistral => "Mistral AI",
            Self::Gemini => "Google Gemini",
            Self::Cohere => "Cohere",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = crate::NovaError;

    /// Parse a canonical provider slug, as written by [`ProviderId::as_str`].
    ///
    /// Aliases are not accepted here; they belong to the configurable
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`NovaError::UnsupportedProvider`](crate::NovaError::UnsupportedProvider)
    /// if the string does not match any known provider name or alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| crate::NovaError::UnsupportedProvider(s.to_string()))
    }
}
