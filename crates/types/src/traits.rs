//! Async traits shared across all novax crates.
//!
//! Every cross-crate abstraction is defined here so that higher layers depend
//! only on `novax-types`, not on each other.

use crate::{Generation, ProviderId};
use async_trait::async_trait;
use secrecy::SecretString;

pub use crate::error::Result;

/// Persistent storage for opaque credential blobs and legacy plaintext options.
///
/// The store never interprets values: ciphertext is produced and consumed by
/// the vault, and legacy options are read verbatim. Writes replace any prior
/// value (last writer wins).
#[async_trait]
pub trait SecretStore: Send + Sync {
    // ── Credential blobs, keyed by provider slug ──────────────────────────

    /// Load the stored blob for a provider.
    async fn load_credential(&self, provider: &str) -> Result<Option<String>>;
    /// Persist (or overwrite) the blob for a provider.
    async fn save_credential(&self, provider: &str, blob: &str) -> Result<()>;
    /// Remove the blob for a provider. Removing an absent blob is not an error.
    async fn remove_credential(&self, provider: &str) -> Result<()>;
    /// List provider slugs that currently have a stored blob.
    async fn list_credentials(&self) -> Result<Vec<String>>;

    // ── Named options (legacy plaintext keys) ─────────────────────────────

    /// Load a named option.
    async fn load_option(&self, name: &str) -> Result<Option<String>>;
    /// Persist (or overwrite) a named option.
    async fn save_option(&self, name: &str, value: &str) -> Result<()>;
    /// Remove a named option. Removing an absent option is not an error.
    async fn remove_option(&self, name: &str) -> Result<()>;
}

/// Receives token counts after successful provider calls.
pub trait UsageSink: Send + Sync {
    /// Record `tokens` consumed by one successful call to `provider`.
    fn record(&self, provider: ProviderId, tokens: u64);

    /// Record a failed call to `provider`. Ignored by default.
    fn record_failure(&self, _provider: ProviderId) {}
}

/// Translates a one-shot prompt into a provider's wire format and back.
///
/// Adapters are stateless and never retry; fallback is the dispatcher's job.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider this adapter talks to.
    fn provider(&self) -> ProviderId;

    /// Send `prompt` using `api_key` and return the trimmed completion.
    async fn generate(&self, prompt: &str, api_key: &SecretString) -> Result<Generation>;
}
