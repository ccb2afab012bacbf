//! Anthropic Messages API adapter.
//!
//! Auth: `x-api-key` plus the `anthropic-version` header.
//! Output: first text block of `content`; usage from `input_tokens` and
//! `output_tokens`.
use crate::AdapterSettings;
use crate::http_util::{ProviderHttp, non_empty_output, sanitize_prompt};
use async_trait::async_trait;
use novax_types::{
    Generation, NovaError, ProviderAdapter, ProviderId, TokenUsage, traits::Result,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

/// Required Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    ph: ProviderHttp,
    settings: AdapterSettings,
}

impl AnthropicAdapter {
    pub fn new(ph: ProviderHttp, settings: AdapterSettings) -> Self {
        Self { ph, settings }
    }

    fn build_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "system": self.settings.system_prompt,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }
}

fn parse_response(json: &Value) -> Result<Generation> {
    let text = json
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| blocks.iter().find_map(|b| b.get("text")?.as_str()))
        .ok_or_else(|| NovaError::InvalidResponse("anthropic: missing content[].text".into()))?;
    let output = non_empty_output(text, ProviderId::Anthropic.as_str())?;

    let usage = json.get("usage").and_then(|u| {
        Some(TokenUsage::new(
            u.get("input_tokens")?.as_u64()?,
            u.get("output_tokens")?.as_u64()?,
        ))
    });
    Ok(Generation { output, usage })
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    async fn generate(&self, prompt: &str, api_key: &SecretString) -> Result<Generation> {
        let prompt = sanitize_prompt(prompt)?;
        let builder = self
            .ph
            .client()
            .post(&self.settings.endpoint)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.build_body(&prompt));

        let json = self.ph.send_json(builder).await?;
        parse_response(&json)
    }
}
