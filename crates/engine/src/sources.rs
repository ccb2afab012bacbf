//! Ordered credential sources consulted by the dispatcher.
//!
//! The default chain is the encrypted vault, then the per-provider legacy
//! plaintext option, then the shared legacy option. The order comes from
//! `dispatch.credential_sources`.

use async_trait::async_trait;
use novax_config::{Config, CredentialSourceKind};
use novax_types::{ProviderId, SecretStore};
use novax_vault::{CredentialVault, SHARED_LEGACY_OPTION, legacy_option_name, looks_masked};
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;

/// One place a provider key may come from.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// The key for `provider`, if this source has a usable one.
    async fn resolve(&self, provider: ProviderId) -> Option<SecretString>;
}

/// Encrypted vault entries.
pub struct VaultSource(pub Arc<CredentialVault>);

#[async_trait]
impl CredentialSource for VaultSource {
    fn name(&self) -> &'static str {
        "vault"
    }

    async fn resolve(&self, provider: ProviderId) -> Option<SecretString> {
        self.0.fetch(provider).await
    }
}

/// Legacy plaintext `<provider>_api_key` options.
pub struct ProviderOptionSource(pub Arc<dyn SecretStore>);

#[async_trait]
impl CredentialSource for ProviderOptionSource {
    fn name(&self) -> &'static str {
        "provider_option"
    }

    async fn resolve(&self, provider: ProviderId) -> Option<SecretString> {
        read_option(self.0.as_ref(), &legacy_option_name(provider)).await
    }
}

/// The legacy plaintext `api_key` option shared by every provider.
pub struct SharedOptionSource(pub Arc<dyn SecretStore>);

#[async_trait]
impl CredentialSource for SharedOptionSource {
    fn name(&self) -> &'static str {
        "shared_option"
    }

    async fn resolve(&self, _provider: ProviderId) -> Option<SecretString> {
        read_option(self.0.as_ref(), SHARED_LEGACY_OPTION).await
    }
}

/// Plaintext keys from `providers.<slug>.api_key` in configuration.
pub struct ConfigSource(HashMap<ProviderId, String>);

impl ConfigSource {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let keys = config
            .providers
            .iter()
            .filter_map(|(p, pc)| pc.api_key.clone().map(|k| (*p, k)))
            .collect();
        Self(keys)
    }
}

#[async_trait]
impl CredentialSource for ConfigSource {
    fn name(&self) -> &'static str {
        "config"
    }

    async fn resolve(&self, provider: ProviderId) -> Option<SecretString> {
        usable(self.0.get(&provider)?)
    }
}

async fn read_option(store: &dyn SecretStore, name: &str) -> Option<SecretString> {
    match store.load_option(name).await {
        Ok(Some(value)) => usable(&value),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(option = name, error = %e, "legacy option lookup failed");
            None
        }
    }
}

fn usable(value: &str) -> Option<SecretString> {
    let value = value.trim();
    if value.is_empty() || looks_masked(value) {
        return None;
    }
    Some(SecretString::from(value))
}

/// Sources tried in order; the first hit wins.
#[derive(Clone, Default)]
pub struct CredentialChain {
    sources: Vec<Arc<dyn CredentialSource>>,
}

impl CredentialChain {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Builds the chain named by `dispatch.credential_sources`.
    #[must_use]
    pub fn from_config(
        config: &Config,
        vault: &Arc<CredentialVault>,
        store: &Arc<dyn SecretStore>,
    ) -> Self {
        let sources = config
            .dispatch
            .credential_sources
            .iter()
            .map(|kind| -> Arc<dyn CredentialSource> {
                match kind {
                    CredentialSourceKind::Vault => Arc::new(VaultSource(Arc::clone(vault))),
                    CredentialSourceKind::ProviderOption => {
                        Arc::new(ProviderOptionSource(Arc::clone(store)))
                    }
                    CredentialSourceKind::SharedOption => {
                        Arc::new(SharedOptionSource(Arc::clone(store)))
                    }
                    CredentialSourceKind::Config => Arc::new(ConfigSource::from_config(config)),
                }
            })
            .collect();
        Self::new(sources)
    }

    /// Names of the sources in lookup order.
    #[must_use]
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// The first key any source yields, with the name of that source.
    pub async fn resolve(&self, provider: ProviderId) -> Option<(SecretString, &'static str)> {
        for source in &self.sources {
            if let Some(key) = source.resolve(provider).await {
                tracing::debug!(%provider, source = source.name(), "resolved API key");
                return Some((key, source.name()));
            }
        }
        None
    }
}
