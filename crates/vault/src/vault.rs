//! Encrypted credential lifecycle: store, fetch, rotate, delete.
//!
//! Read paths are fail-safe: a missing record and an undecryptable one both
//! surface as `None`, with the actual cause logged. Write paths reject masked
//! placeholders before anything else.
use crate::{KeyCipher, RuleSet, looks_masked};
use novax_types::{NovaError, ProviderId, SecretStore, ValidationResult, traits::Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Option name of the plaintext key shared by all providers.
pub const SHARED_LEGACY_OPTION: &str = "api_key";

/// Option name of a provider's legacy plaintext key.
#[must_use]
pub fn legacy_option_name(provider: ProviderId) -> String {
    format!("{}_api_key", provider.as_str())
}

/// Display form of a key: first four and last four characters around a run
/// of bullets. Short keys are fully hidden.
#[must_use]
pub fn mask(secret: &str) -> String {
    const BULLETS: &str = "••••••••";
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return BULLETS.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{BULLETS}{tail}")
}

pub struct CredentialVault {
    store: Arc<dyn SecretStore>,
    cipher: KeyCipher,
    rules: Arc<RuleSet>,
}

impl CredentialVault {
    pub fn new(store: Arc<dyn SecretStore>, cipher: KeyCipher, rules: Arc<RuleSet>) -> Self {
        Self {
            store,
            cipher,
            rules,
        }
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Encrypt and persist `raw` as the only value for `provider`.
    ///
    /// Format rules are not applied here; callers that accept user input
    /// validate first.
    ///
    /// # Errors
    ///
    /// Returns [`NovaError::MissingKey`] for empty input,
    /// [`NovaError::MaskedSecret`] for masked input, or a crypto/storage error.
    pub async fn store(&self, provider: ProviderId, raw: &str) -> Result<()> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(NovaError::MissingKey(provider.to_string()));
        }
        if looks_masked(raw) {
            return Err(NovaError::MaskedSecret(provider.to_string()));
        }
        let blob = self.cipher.encrypt(raw)?;
        self.store.save_credential(provider.as_str(), &blob).await?;
        tracing::info!(%provider, key = %mask(raw), "stored API key");
        Ok(())
    }

    /// Decrypt the stored key for `provider`.
    ///
    /// Returns `None` when nothing is stored or the value cannot be read back.
    pub async fn fetch(&self, provider: ProviderId) -> Option<SecretString> {
        let blob = match self.store.load_credential(provider.as_str()).await {
            Ok(Some(blob)) if !blob.is_empty() => blob,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(%provider, error = %e, "credential lookup failed");
                return None;
            }
        };
        match self.cipher.decrypt(&blob) {
            Ok(plain) if !plain.is_empty() => Some(SecretString::from(plain)),
            Ok(_) => {
                tracing::debug!(%provider, "stored credential decrypted to empty string");
                None
            }
            Err(e) => {
                tracing::warn!(%provider, error = %e, "stored credential could not be decrypted");
                None
            }
        }
    }

    /// Replace the stored key for `provider`.
    ///
    /// # Errors
    ///
    /// In check order: [`NovaError::MaskedSecret`], [`NovaError::InvalidKey`]
    /// when the format rule fails, [`NovaError::Unchanged`] when `new_key`
    /// equals the stored key (storage untouched), and
    /// [`NovaError::AlreadyExists`] when `force` is false and a key exists.
    pub async fn rotate(&self, provider: ProviderId, new_key: &str, force: bool) -> Result<()> {
        let new_key = new_key.trim();
        if looks_masked(new_key) {
            return Err(NovaError::MaskedSecret(provider.to_string()));
        }
        let verdict = self.rules.validate(new_key, provider);
        if !verdict.valid {
            return Err(NovaError::InvalidKey(verdict.message));
        }
        if let Some(current) = self.fetch(provider).await
            && current.expose_secret() == new_key
        {
            return Err(NovaError::Unchanged(provider.to_string()));
        }
        if !force && self.exists(provider).await {
            return Err(NovaError::AlreadyExists(provider.to_string()));
        }
        self.store(provider, new_key).await?;
        tracing::info!(%provider, "rotated API key");
        Ok(())
    }

    /// Whether a non-empty value is stored. Does not decrypt.
    pub async fn exists(&self, provider: ProviderId) -> bool {
        match self.store.load_credential(provider.as_str()).await {
            Ok(blob) => blob.is_some_and(|b| !b.is_empty()),
            Err(e) => {
                tracing::warn!(%provider, error = %e, "credential lookup failed");
                false
            }
        }
    }

    /// Providers with a non-empty stored record, in slug order. Rows whose
    /// slug is not a known provider are skipped.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot list records.
    pub async fn stored_providers(&self) -> Result<Vec<ProviderId>> {
        let slugs = self.store.list_credentials().await?;
        Ok(slugs
            .iter()
            .filter_map(|slug| match slug.parse::<ProviderId>() {
                Ok(p) => Some(p),
                Err(_) => {
                    tracing::debug!(slug = %slug, "ignoring credential for unknown provider");
                    None
                }
            })
            .collect())
    }

    /// Remove the stored key. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    pub async fn delete(&self, provider: ProviderId) -> Result<()> {
        self.store.remove_credential(provider.as_str()).await?;
        tracing::info!(%provider, "deleted API key");
        Ok(())
    }

    /// Format verdict on the stored key, or `missing` when none can be read.
    pub async fn status(&self, provider: ProviderId) -> ValidationResult {
        match self.fetch(provider).await {
            Some(key) => self.rules.validate(key.expose_secret(), provider),
            None => self.missing(provider),
        }
    }

    /// The `missing` verdict for `provider`.
    #[must_use]
    pub fn missing(&self, provider: ProviderId) -> ValidationResult {
        let label = self.rules.rule_for(provider).label.clone();
        let message = format!("No {label} API key is stored.");
        ValidationResult::missing(label, message)
    }

    /// Masked display form of the stored key.
    pub async fn masked(&self, provider: ProviderId) -> Option<String> {
        self.fetch(provider)
            .await
            .map(|key| mask(key.expose_secret()))
    }

    /// Move a provider's legacy plaintext option into the vault.
    ///
    /// Only runs when the vault has no key for `provider`. Invalid or masked
    /// legacy values are left in place. Returns whether a key was migrated.
    ///
    /// # Errors
    ///
    /// Returns a storage or crypto error.
    pub async fn migrate_legacy(&self, provider: ProviderId) -> Result<bool> {
        if self.exists(provider).await {
            return Ok(false);
        }
        let option = legacy_option_name(provider);
        let Some(plain) = self.store.load_option(&option).await? else {
            return Ok(false);
        };
        let plain = plain.trim();
        if plain.is_empty() {
            return Ok(false);
        }
        let verdict = self.rules.validate(plain, provider);
        if !verdict.valid {
            tracing::warn!(%provider, reason = %verdict.message, "legacy key not migrated");
            return Ok(false);
        }
        self.store(provider, plain).await?;
        self.store.remove_option(&option).await?;
        tracing::info!(%provider, "migrated legacy plaintext key");
        Ok(true)
    }

    /// Assign the shared legacy key to the provider it appears to belong to.
    ///
    /// The shared option is removed only after a successful migration.
    ///
    /// # Errors
    ///
    /// Returns a storage or crypto error.
    pub async fn migrate_shared_legacy(&self) -> Result<Option<ProviderId>> {
        let Some(plain) = self.store.load_option(SHARED_LEGACY_OPTION).await? else {
            return Ok(None);
        };
        let plain = plain.trim();
        let Some(provider) = self.rules.detect_provider(plain) else {
            tracing::warn!("shared legacy key does not match any provider format");
            return Ok(None);
        };
        if self.exists(provider).await {
            tracing::debug!(%provider, "shared legacy key skipped; provider already has a key");
            return Ok(None);
        }
        let verdict = self.rules.validate(plain, provider);
        if !verdict.valid {
            tracing::warn!(%provider, reason = %verdict.message, "shared legacy key not migrated");
            return Ok(None);
        }
        self.store(provider, plain).await?;
        self.store.remove_option(SHARED_LEGACY_OPTION).await?;
        tracing::info!(%provider, "migrated shared legacy key");
        Ok(Some(provider))
    }
}
