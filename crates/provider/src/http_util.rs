//! Shared HTTP utilities for provider adapters.
//!
//! Centralises the send → status-check → parse sequence and the mapping of
//! failures onto [`NovaError`] so every adapter reports errors the same way.

use novax_types::{NovaError, traits::Result};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// Shared HTTP helper that all adapters use to send requests.
#[derive(Clone)]
pub struct ProviderHttp {
    http: Client,
}

impl ProviderHttp {
    /// Creates a new helper wrapping the given HTTP client.
    #[must_use]
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Builds a client whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`NovaError::Transport`] if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("novax/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Returns a reference to the inner HTTP client for building requests.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.http
    }

    /// Sends a request and checks for success status.
    ///
    /// # Errors
    ///
    /// Returns [`NovaError::Transport`] if the request fails to send or times
    /// out, and [`NovaError::Upstream`] on non-2xx status. The upstream
    /// message is taken from the error body when it has one.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let resp = builder.send().await.inspect_err(|e| {
            tracing::debug!(timeout = e.is_timeout(), error = %e, "request failed");
        })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let url = resp.url().clone();
        let text = resp.text().await.unwrap_or_default();
        let message =
            extract_error_message(&text).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        tracing::debug!(%url, status = status.as_u16(), message = %message, "upstream error");
        Err(NovaError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    /// Sends a request and parses the 2xx body as JSON.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), plus [`NovaError::InvalidResponse`] when
    /// the body is not JSON.
    pub async fn send_json(&self, builder: RequestBuilder) -> Result<Value> {
        let resp = self.send(builder).await?;
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| NovaError::InvalidResponse(e.to_string()))
    }
}

/// Pulls a human-readable message out of a provider error body.
///
/// Recognises `{"error": {"message", "code"|"type"|"status"}}`,
/// `{"error": "..."}` and `{"message": "..."}`.
#[must_use]
pub fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error");

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| error.and_then(Value::as_str))
        .or_else(|| json.get("message").and_then(Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let code = error.and_then(|e| {
        ["code", "type", "status"].iter().find_map(|k| match e.get(*k)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    });

    match (message, code) {
        (Some(m), Some(c)) => Some(format!("{m} ({c})")),
        (Some(m), None) => Some(m.to_string()),
        (None, Some(c)) => Some(c),
        (None, None) => None,
    }
}

/// Trims the prompt and strips control characters other than newline and tab.
///
/// # Errors
///
/// Returns [`NovaError::EmptyPrompt`] if nothing is left.
pub fn sanitize_prompt(prompt: &str) -> Result<String> {
    let cleaned: String = prompt
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(NovaError::EmptyPrompt);
    }
    Ok(cleaned.to_string())
}

/// Trims extracted completion text, failing on an empty result.
pub(crate) fn non_empty_output(text: &str, provider: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(NovaError::EmptyResponse(provider.to_string()));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_http_clone() {
        let http = ProviderHttp::new(Client::new());
        let _http2 = http.clone();
    }

    #[test]
    fn test_extract_openai_error() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Incorrect API key provided (invalid_api_key)")
        );
    }

    #[test]
    fn test_extract_gemini_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("API key not valid. (400)")
        );
    }

    #[test]
    fn test_extract_flat_message() {
        assert_eq!(
            extract_error_message(r#"{"message":"invalid api token"}"#).as_deref(),
            Some("invalid api token")
        );
        assert_eq!(
            extract_error_message(r#"{"error":"rate limited"}"#).as_deref(),
            Some("rate limited")
        );
    }

    #[test]
    fn test_extract_none() {
        assert!(extract_error_message("<html>bad gateway</html>").is_none());
        assert!(extract_error_message("{}").is_none());
        assert!(extract_error_message("").is_none());
    }

    #[test]
    fn test_sanitize_prompt() {
        assert_eq!(
            sanitize_prompt("  a\u{0}b\u{7}\nc\td  ").unwrap(),
            "ab\nc\td"
        );
        assert!(matches!(sanitize_prompt(" \n\t "), Err(NovaError::EmptyPrompt)));
        assert!(matches!(sanitize_prompt("\u{1b}"), Err(NovaError::EmptyPrompt)));
    }

    #[test]
    fn test_non_empty_output() {
        assert_eq!(non_empty_output("  hi ", "openai").unwrap(), "hi");
        assert!(matches!(
            non_empty_output("   ", "openai"),
            Err(NovaError::EmptyResponse(_))
        ));
    }
}
