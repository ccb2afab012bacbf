//! OpenAI-compatible chat completions: OpenAI, Groq and Mistral.
//!
//! Auth: `Authorization: Bearer`.
//! Output: `choices[0].message.content`; usage from `prompt_tokens` and
//! `completion_tokens`.
use crate::AdapterSettings;
use crate::http_util::{ProviderHttp, non_empty_output, sanitize_prompt};
use async_trait::async_trait;
use novax_types::{
    Generation, NovaError, ProviderAdapter, ProviderId, TokenUsage, traits::Result,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

/// Adapter for any provider speaking the OpenAI chat completions format.
pub struct OpenAICompatAdapter {
    provider: ProviderId,
    ph: ProviderHttp,
    settings: AdapterSettings,
}

impl OpenAICompatAdapter {
    pub fn new(provider: ProviderId, ph: ProviderHttp, settings: AdapterSettings) -> Self {
        Self {
            provider,
            ph,
            settings,
        }
    }

    fn build_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": self.settings.system_prompt },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        })
    }
}

/// Extracts the completion and usage from an OpenAI-format response.
pub(crate) fn parse_response(provider: ProviderId, json: &Value) -> Result<Generation> {
    let text = json
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            NovaError::InvalidResponse(format!("{provider}: missing choices[0].message.content"))
        })?;
    let output = non_empty_output(text, provider.as_str())?;

    let usage = json.get("usage").and_then(|u| {
        let input = u.get("prompt_tokens")?.as_u64()?;
        let output = u.get("completion_tokens")?.as_u64()?;
        Some(TokenUsage::new(input, output))
    });
    Ok(Generation { output, usage })
}

#[async_trait]
impl ProviderAdapter for OpenAICompatAdapter {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    async fn generate(&self, prompt: &str, api_key: &SecretString) -> Result<Generation> {
        let prompt = sanitize_prompt(prompt)?;
        let body = self.build_body(&prompt);

        let builder = self
            .ph
            .client()
            .post(&self.settings.endpoint)
            .bearer_auth(api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&body);

        let json = self.ph.send_json(builder).await?;
        parse_response(self.provider, &json)
    }
}
