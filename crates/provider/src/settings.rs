//! Effective request settings for one adapter.

use novax_config::Config;
use novax_types::ProviderId;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Endpoint, model and sampling parameters after configuration overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl AdapterSettings {
    /// Built-in defaults for `provider`, with the given system prompt.
    #[must_use]
    pub fn defaults(provider: ProviderId, system_prompt: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(provider).to_string(),
            model: default_model(provider).to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: system_prompt.into(),
        }
    }

    /// Defaults overlaid with `providers.<slug>` from `config`.
    #[must_use]
    pub fn from_config(provider: ProviderId, config: &Config) -> Self {
        let pc = config.provider(provider);
        let base = Self::defaults(provider, config.dispatch.system_prompt.clone());
        Self {
            endpoint: pc.endpoint.unwrap_or(base.endpoint),
            model: pc.model.unwrap_or(base.model),
            temperature: pc.temperature.unwrap_or(base.temperature),
            max_tokens: pc.max_tokens.unwrap_or(base.max_tokens),
            system_prompt: base.system_prompt,
        }
    }

    /// Points the adapter at `endpoint` (used by mock-server tests).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Default completion endpoint. Gemini's contains a `{model}` placeholder.
#[must_use]
pub const fn default_endpoint(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::OpenAI => "https://api.openai.com/v1/chat/completions",
        ProviderId::Groq => "https://api.groq.com/openai/v1/chat/completions",
        ProviderId::Mistral => "https://api.mistral.ai/v1/chat/completions",
        ProviderId::Anthropic => "https://api.anthropic.com/v1/messages",
        ProviderId::Gemini => {
            "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent"
        }
        ProviderId::Cohere => "https://api.cohere.ai/v1/chat",
    }
}

#[must_use]
pub const fn default_model(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::OpenAI => "gpt-4o-mini",
        ProviderId::Groq => "llama-3.3-70b-versatile",
        ProviderId::Mistral => "mistral-large-latest",
        ProviderId::Anthropic => "claude-sonnet-4-5",
        ProviderId::Gemini => "gemini-2.0-flash",
        ProviderId::Cohere => "command-r-plus",
    }
}
