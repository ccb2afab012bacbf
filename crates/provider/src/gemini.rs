//! Google Gemini `generateContent` adapter.
//!
//! Auth: `x-goog-api-key`. The endpoint may contain a `{model}` placeholder.
use crate::AdapterSettings;
use crate::http_util::{ProviderHttp, non_empty_output, sanitize_prompt};
use async_trait::async_trait;
use novax_types::{
    Generation, NovaError, ProviderAdapter, ProviderId, TokenUsage, traits::Result,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

pub struct GeminiAdapter {
    ph: ProviderHttp,
    settings: AdapterSettings,
}

impl GeminiAdapter {
    pub fn new(ph: ProviderHttp, settings: AdapterSettings) -> Self {
        Self { ph, settings }
    }

    fn url(&self) -> String {
        self.settings.endpoint.replace("{model}", &self.settings.model)
    }

    fn build_body(&self, prompt: &str) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": self.settings.system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_tokens,
            },
        })
    }
}

fn parse_response(json: &Value) -> Result<Generation> {
    let text = json
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            NovaError::InvalidResponse("gemini: missing candidates[0].content.parts[0].text".into())
        })?;
    let output = non_empty_output(text, ProviderId::Gemini.as_str())?;

    let usage = json.get("usageMetadata").and_then(|u| {
        Some(TokenUsage::new(
            u.get("promptTokenCount")?.as_u64()?,
            u.get("candidatesTokenCount")?.as_u64()?,
        ))
    });
    Ok(Generation { output, usage })
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn generate(&self, prompt: &str, api_key: &SecretString) -> Result<Generation> {
        let prompt = sanitize_prompt(prompt)?;
        let builder = self
            .ph
            .client()
            .post(self.url())
            .header("x-goog-api-key", api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&self.build_body(&prompt));

        let json = self.ph.send_json(builder).await?;
        parse_response(&json)
    }
}
