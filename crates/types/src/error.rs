//! Unified error type for the novax workspace.

use thiserror::Error;

/// Enumerates all error kinds that can occur across novax crates.
#[derive(Debug, Error)]
pub enum NovaError {
    /// The prompt was empty after trimming and sanitising.
    #[error("prompt cannot be empty")]
    EmptyPrompt,

    /// The secret is a masked display placeholder, not a real key.
    #[error("masked value rejected for {0}: enter the full API key")]
    MaskedSecret(String),

    /// The secret failed the provider's format rule.
    #[error("{0}")]
    InvalidKey(String),

    /// The provider name is not in the supported set.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Rotation was asked to store the key that is already stored.
    #[error("new API key for {0} is identical to the current one")]
    Unchanged(String),

    /// A credential exists and the write was not forced.
    #[error("an API key for {0} already exists; use force to overwrite")]
    AlreadyExists(String),

    /// No key could be resolved for the provider.
    #[error("API key missing for {0}")]
    MissingKey(String),

    /// The provider is disabled in configuration.
    #[error("provider disabled: {0}")]
    ProviderDisabled(String),

    /// HTTP transport error (connect failure, timeout, TLS, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The upstream provider returned a non-success status.
    #[error("upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },

    /// A 2xx response did not contain the expected output field.
    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    /// A 2xx response contained an empty completion.
    #[error("empty response from {0}")]
    EmptyResponse(String),

    /// Persistent storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Encryption or decryption failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ── Feature-gated From impls ──────────────────────────────────────────────────

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for NovaError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for NovaError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl NovaError {
    /// Returns `true` if the error is likely transient and worth retrying.
    ///
    /// The dispatcher never retries the same provider; this only feeds logs
    /// and diagnostics.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::Transport(_) => true,
            _ => false,
        }
    }

    /// Returns `true` for errors caused by caller input rather than by a
    /// provider or the environment.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyPrompt
                | Self::MaskedSecret(_)
                | Self::InvalidKey(_)
                | Self::UnsupportedProvider(_)
                | Self::Unchanged(_)
                | Self::AlreadyExists(_)
        )
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, NovaError>;
