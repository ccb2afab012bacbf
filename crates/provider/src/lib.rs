//! Provider registry and adapter implementations.
//!
//! Each adapter module implements [`ProviderAdapter`] for one wire format.
//! [`make_adapter`] builds a boxed adapter for a provider and
//! [`build_adapters`] builds the full set from configuration.

pub mod anthropic;
pub mod cohere;
pub mod gemini;
pub mod http_util;
pub mod openai;
pub mod registry;
pub mod settings;

pub use anthropic::AnthropicAdapter;
pub use cohere::CohereAdapter;
pub use gemini::GeminiAdapter;
pub use http_util::{ProviderHttp, extract_error_message, sanitize_prompt};
pub use openai::OpenAICompatAdapter;
pub use registry::ProviderRegistry;
pub use settings::AdapterSettings;

use novax_config::Config;
use novax_types::{ProviderAdapter, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;

/// Create a boxed adapter for the given provider.
#[must_use]
pub fn make_adapter(
    provider: ProviderId,
    http: ProviderHttp,
    settings: AdapterSettings,
) -> Box<dyn ProviderAdapter> {
    match provider {
        ProviderId::OpenAI | ProviderId::Groq | ProviderId::Mistral => {
            Box::new(OpenAICompatAdapter::new(provider, http, settings))
        }
        ProviderId::Anthropic => Box::new(AnthropicAdapter::new(http, settings)),
        ProviderId::Gemini => Box::new(GeminiAdapter::new(http, settings)),
        ProviderId::Cohere => Box::new(CohereAdapter::new(http, settings)),
    }
}

/// Adapters for every supported provider, sharing one HTTP client.
#[must_use]
pub fn build_adapters(
    config: &Config,
    http: &ProviderHttp,
) -> HashMap<ProviderId, Arc<dyn ProviderAdapter>> {
    config
        .registry
        .supported
        .iter()
        .map(|&p| {
            let adapter: Arc<dyn ProviderAdapter> =
                make_adapter(p, http.clone(), AdapterSettings::from_config(p, config)).into();
            (p, adapter)
        })
        .collect()
}
