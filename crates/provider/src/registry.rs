//! Provider registry: supported identifiers, labels and alias resolution.

use novax_config::RegistryConfig;
use novax_types::ProviderId;
use std::collections::HashMap;

/// Canonical provider metadata, built once from configuration.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    supported: Vec<ProviderId>,
    aliases: HashMap<String, String>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(supported: Vec<ProviderId>, aliases: HashMap<String, String>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_lowercase()))
            .collect();
        Self { supported, aliases }
    }

    #[must_use]
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.supported.clone(), config.aliases.clone())
    }

    /// Supported providers in configuration order.
    #[must_use]
    pub fn supported_providers(&self) -> &[ProviderId] {
        &self.supported
    }

    /// Trims, lowercases and applies the alias map. Unknown names pass through.
    #[must_use]
    pub fn normalize(&self, name: &str) -> String {
        let name = name.trim().to_lowercase();
        match self.aliases.get(&name) {
            Some(target) => target.clone(),
            None => name,
        }
    }

    /// Typed lookup after normalisation; `None` for unsupported names.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ProviderId> {
        let slug = self.normalize(name);
        self.supported.iter().copied().find(|p| p.as_str() == slug)
    }

    #[must_use]
    pub fn is_valid(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Human label, or the capitalised slug for unknown providers.
    #[must_use]
    pub fn display_name(&self, name: &str) -> String {
        if let Some(p) = self.resolve(name) {
            return p.label().to_string();
        }
        let slug = self.normalize(name);
        let mut chars = slug.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}
