//! Cohere chat adapter.
//!
//! Takes a single `message` with the system prompt as `preamble` and returns
//! the completion in `text`.
use crate::AdapterSettings;
use crate::http_util::{ProviderHttp, non_empty_output, sanitize_prompt};
use async_trait::async_trait;
use novax_types::{
    Generation, NovaError, ProviderAdapter, ProviderId, TokenUsage, traits::Result,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

pub struct CohereAdapter {
    ph: ProviderHttp,
    settings: AdapterSettings,
}

impl CohereAdapter {
    pub fn new(ph: ProviderHttp, settings: AdapterSettings) -> Self {
        Self { ph, settings }
    }

    fn build_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.settings.model,
            "message": prompt,
            "preamble": self.settings.system_prompt,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
        })
    }
}

fn parse_response(json: &Value) -> Result<Generation> {
    let text = json
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| NovaError::InvalidResponse("cohere: missing text".into()))?;
    let output = non_empty_output(text, ProviderId::Cohere.as_str())?;

    let usage = json.pointer("/meta/billed_units").and_then(|u| {
        Some(TokenUsage::new(
            u.get("input_tokens")?.as_u64()?,
            u.get("output_tokens")?.as_u64()?,
        ))
    });
    Ok(Generation { output, usage })
}

#[async_trait]
impl ProviderAdapter for CohereAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Cohere
    }

    async fn generate(&self, prompt: &str, api_key: &SecretString) -> Result<Generation> {
        let prompt = sanitize_prompt(prompt)?;
        let builder = self
            .ph
            .client()
            .post(&self.settings.endpoint)
            .bearer_auth(api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&self.build_body(&prompt));

        let json = self.ph.send_json(builder).await?;
        parse_response(&json)
    }
}
