//! Composition root wiring configuration into a ready dispatcher.

use crate::api::{self, GenerateRequest, GenerateResponse, KeyService};
use crate::dispatch::Dispatcher;
use crate::sources::CredentialChain;
use crate::usage::{UsageSnapshot, UsageStats};
use novax_config::Config;
use novax_provider::{ProviderHttp, ProviderRegistry, build_adapters};
use novax_types::{NovaError, SecretStore, UsageSink, traits::Result};
use novax_vault::{CredentialVault, KeyCipher, RuleSet};
use std::sync::Arc;
use std::time::Duration;

/// Everything a request handler needs, built once per process.
pub struct Engine {
    dispatcher: Dispatcher,
    keys: KeyService,
    vault: Arc<CredentialVault>,
    usage: Arc<UsageStats>,
}

impl Engine {
    /// Builds the vault, registry, adapters and dispatcher from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`NovaError::Config`] for a zero `dispatch.timeout_secs`, or
    /// [`NovaError::Transport`] if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config, store: Arc<dyn SecretStore>) -> Result<Self> {
        if config.dispatch.timeout_secs == 0 {
            return Err(NovaError::Config(
                "dispatch.timeout_secs must be greater than zero".into(),
            ));
        }
        let rules = Arc::new(RuleSet::new().with_enabled(&config.registry.supported));
        let cipher = KeyCipher::from_config(&config.vault, &config.site);
        let vault = Arc::new(CredentialVault::new(Arc::clone(&store), cipher, rules));
        let registry = Arc::new(ProviderRegistry::from_config(&config.registry));

        let http = ProviderHttp::with_timeout(Duration::from_secs(config.dispatch.timeout_secs))?;
        let adapters = build_adapters(config, &http);
        let credentials = CredentialChain::from_config(config, &vault, &store);
        let usage = Arc::new(UsageStats::new());

        tracing::debug!(
            providers = adapters.len(),
            sources = ?credentials.source_names(),
            chain = ?config.dispatch.fallback_chain,
            "engine initialised"
        );

        let dispatcher = Dispatcher::new(Arc::clone(&registry), adapters, credentials)
            .configured(config)
            .with_usage_sink(Arc::clone(&usage) as Arc<dyn UsageSink>);
        let keys = KeyService::new(registry, Arc::clone(&vault));

        Ok(Self {
            dispatcher,
            keys,
            vault,
            usage,
        })
    }

    pub async fn generate(&self, req: &GenerateRequest) -> GenerateResponse {
        api::generate(&self.dispatcher, req).await
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn keys(&self) -> &KeyService {
        &self.keys
    }

    #[must_use]
    pub fn vault(&self) -> &Arc<CredentialVault> {
        &self.vault
    }

    #[must_use]
    pub fn usage(&self) -> UsageSnapshot {
        self.usage.snapshot()
    }
}
