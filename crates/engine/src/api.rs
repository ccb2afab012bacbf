//! Entry points consumed by the outer request layer and the CLI.
//!
//! Every handler returns a structured response; input problems become
//! `success: false` with a specific message rather than an error.

use crate::dispatch::{DispatchOutcome, Dispatcher};
use novax_provider::ProviderRegistry;
use novax_types::{KeyStatus, NovaError, ProviderId};
use novax_vault::{CredentialVault, RuleSet, looks_masked};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Used by collaborators for file naming; ignored by dispatch.
    pub title: String,
    pub prompt: String,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

impl From<DispatchOutcome> for GenerateResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        if outcome.success {
            return Self {
                success: true,
                output: outcome.output,
                provider: outcome.provider.map(|p| p.as_str().to_string()),
                message: None,
                tried: None,
            };
        }
        let tried = (!outcome.attempts.is_empty()).then(|| outcome.tried());
        Self {
            success: false,
            output: None,
            provider: None,
            message: outcome.message,
            tried,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveKeyRequest {
    pub provider: String,
    pub api_key: String,
}

fn default_force() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateKeyRequest {
    pub provider: String,
    pub new_key: String,
    #[serde(default = "default_force")]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateKeyRequest {
    pub provider: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyActionResponse {
    pub success: bool,
    pub message: String,
}

impl KeyActionResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn err(error: &NovaError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateKeyResponse {
    pub valid: bool,
    pub status: KeyStatus,
    pub message: String,
}

/// Stored-key overview for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderKeyStatus {
    pub provider: ProviderId,
    pub label: String,
    pub status: KeyStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked: Option<String>,
}

/// Save, rotate, validate and delete provider keys.
pub struct KeyService {
    registry: Arc<ProviderRegistry>,
    vault: Arc<CredentialVault>,
}

impl KeyService {
    pub fn new(registry: Arc<ProviderRegistry>, vault: Arc<CredentialVault>) -> Self {
        Self { registry, vault }
    }

    fn resolve(&self, name: &str) -> Result<ProviderId, NovaError> {
        self.registry
            .resolve(name)
            .ok_or_else(|| NovaError::UnsupportedProvider(name.trim().to_string()))
    }

    async fn try_save(&self, req: &SaveKeyRequest) -> Result<ProviderId, NovaError> {
        if looks_masked(&req.api_key) {
            return Err(NovaError::MaskedSecret(req.provider.trim().to_string()));
        }
        let provider = self.resolve(&req.provider)?;
        let verdict = self.vault.rules().validate(&req.api_key, provider);
        if !verdict.valid {
            return Err(NovaError::InvalidKey(verdict.message));
        }
        self.vault.store(provider, &req.api_key).await?;
        Ok(provider)
    }

    pub async fn save(&self, req: &SaveKeyRequest) -> KeyActionResponse {
        match self.try_save(req).await {
            Ok(p) => KeyActionResponse::ok(format!("{} API key saved.", p.label())),
            Err(e) => rejected("save", &req.provider, &e),
        }
    }

    async fn try_rotate(&self, req: &RotateKeyRequest) -> Result<ProviderId, NovaError> {
        if looks_masked(&req.new_key) {
            return Err(NovaError::MaskedSecret(req.provider.trim().to_string()));
        }
        let provider = self.resolve(&req.provider)?;
        self.vault.rotate(provider, &req.new_key, req.force).await?;
        Ok(provider)
    }

    pub async fn rotate(&self, req: &RotateKeyRequest) -> KeyActionResponse {
        match self.try_rotate(req).await {
            Ok(p) => KeyActionResponse::ok(format!("{} API key rotated.", p.label())),
            Err(e) => rejected("rotate", &req.provider, &e),
        }
    }

    /// Format check only; nothing is stored. Unknown providers are checked
    /// against the permissive custom rule.
    #[must_use]
    pub fn validate(&self, req: &ValidateKeyRequest) -> ValidateKeyResponse {
        let result = match self.registry.resolve(&req.provider) {
            Some(p) => self.vault.rules().validate(&req.api_key, p),
            None => RuleSet::validate_custom(&req.api_key),
        };
        ValidateKeyResponse {
            valid: result.valid,
            status: result.status,
            message: result.message,
        }
    }

    pub async fn delete(&self, provider: &str) -> KeyActionResponse {
        let result = match self.resolve(provider) {
            Ok(p) => self.vault.delete(p).await.map(|()| p),
            Err(e) => Err(e),
        };
        match result {
            Ok(p) => KeyActionResponse::ok(format!("{} API key deleted.", p.label())),
            Err(e) => rejected("delete", provider, &e),
        }
    }

    /// Best-effort provider guess for a raw key.
    #[must_use]
    pub fn detect(&self, api_key: &str) -> Option<ProviderId> {
        self.vault
            .rules()
            .detect_provider(api_key)
            .filter(|p| self.registry.supported_providers().contains(p))
    }

    /// Status of every supported provider's stored key.
    ///
    /// Only providers with a stored record are decrypted. If the store cannot
    /// list its records, every provider is checked individually.
    pub async fn statuses(&self) -> Vec<ProviderKeyStatus> {
        let stored = match self.vault.stored_providers().await {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!(error = %e, "listing stored keys failed");
                None
            }
        };
        let mut out = Vec::with_capacity(self.registry.supported_providers().len());
        for &provider in self.registry.supported_providers() {
            let present = stored.as_ref().is_none_or(|list| list.contains(&provider));
            let (result, masked) = if present {
                let result = self.vault.status(provider).await;
                (result, self.vault.masked(provider).await)
            } else {
                (self.vault.missing(provider), None)
            };
            out.push(ProviderKeyStatus {
                provider,
                label: result.provider_label,
                status: result.status,
                message: result.message,
                masked,
            });
        }
        out
    }

    /// Moves legacy plaintext keys into the vault.
    ///
    /// # Errors
    ///
    /// Returns a storage or crypto error from the vault.
    pub async fn migrate(&self) -> Result<Vec<ProviderId>, NovaError> {
        let mut migrated = Vec::new();
        for &provider in self.registry.supported_providers() {
            if self.vault.migrate_legacy(provider).await? {
                migrated.push(provider);
            }
        }
        if let Some(provider) = self.vault.migrate_shared_legacy().await? {
            migrated.push(provider);
        }
        Ok(migrated)
    }
}

/// Input problems are the caller's to fix; anything else is logged loudly.
fn rejected(action: &'static str, provider: &str, error: &NovaError) -> KeyActionResponse {
    if error.is_input_error() {
        tracing::debug!(action, provider = %provider, error = %error, "key request rejected");
    } else {
        tracing::warn!(action, provider = %provider, error = %error, "key request failed");
    }
    KeyActionResponse::err(error)
}

/// Runs a [`GenerateRequest`] through the dispatcher.
pub async fn generate(dispatcher: &Dispatcher, req: &GenerateRequest) -> GenerateResponse {
    let outcome = dispatcher
        .dispatch(&req.prompt, req.provider.as_deref())
        .await;
    tracing::debug!(title = %req.title, success = outcome.success, "generate request handled");
    outcome.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use novax_store::InMemorySecretStore;
    use novax_types::{GenerationAttempt, SecretStore};
    use novax_vault::KeyCipher;

    fn service() -> (KeyService, Arc<CredentialVault>, Arc<dyn SecretStore>) {
        let store: Arc<dyn SecretStore> = Arc::new(InMemorySecretStore::new());
        let vault = Arc::new(CredentialVault::new(
            Arc::clone(&store),
            KeyCipher::aes("api-test"),
            Arc::new(RuleSet::new()),
        ));
        let keys = KeyService::new(Arc::new(ProviderRegistry::default()), Arc::clone(&vault));
        (keys, vault, store)
    }

    fn openai_key() -> String {
        format!("sk-{}", "K".repeat(40))
    }

    #[tokio::test]
    async fn test_save_and_status() {
        let (keys, vault, _) = service();
        let resp = keys
            .save(&SaveKeyRequest {
                provider: "OpenAI".into(),
                api_key: openai_key(),
            })
            .await;
        assert!(resp.success, "{}", resp.message);
        assert!(vault.exists(ProviderId::OpenAI).await);

        let statuses = keys.statuses().await;
        let openai = statuses
            .iter()
            .find(|s| s.provider == ProviderId::OpenAI)
            .unwrap();
        assert_eq!(openai.status, KeyStatus::Valid);
        assert_eq!(openai.masked.as_deref(), Some("sk-K••••••••KKKK"));
        let groq = statuses
            .iter()
            .find(|s| s.provider == ProviderId::Groq)
            .unwrap();
        assert_eq!(groq.status, KeyStatus::Missing);
        assert!(groq.masked.is_none());
    }

    #[tokio::test]
    async fn test_status_ignores_foreign_rows() {
        let (keys, _, store) = service();
        store.save_credential("deepseek", "opaque").await.unwrap();
        store.save_credential("groq", "not-ciphertext").await.unwrap();

        let statuses = keys.statuses().await;
        assert_eq!(statuses.len(), ProviderId::all().len());
        assert!(
            statuses
                .iter()
                .all(|s| s.status == KeyStatus::Missing && s.masked.is_none())
        );
    }

    #[tokio::test]
    async fn test_save_rejections() {
        let (keys, vault, _) = service();
        let masked = keys
            .save(&SaveKeyRequest {
                provider: "deepseek".into(),
                api_key: "sk-••••".into(),
            })
            .await;
        assert!(!masked.success);
        assert!(masked.message.contains("masked"));

        let unsupported = keys
            .save(&SaveKeyRequest {
                provider: "deepseek".into(),
                api_key: openai_key(),
            })
            .await;
        assert_eq!(unsupported.message, "unsupported provider: deepseek");

        let invalid = keys
            .save(&SaveKeyRequest {
                provider: "groq".into(),
                api_key: openai_key(),
            })
            .await;
        assert!(!invalid.success);
        assert!(invalid.message.contains("gsk_"), "{}", invalid.message);
        assert!(!vault.exists(ProviderId::Groq).await);
    }

    #[tokio::test]
    async fn test_rotate_flow() {
        let (keys, vault, _) = service();
        let first = keys
            .rotate(&RotateKeyRequest {
                provider: "claude".into(),
                new_key: format!("sk-ant-{}", "a".repeat(30)),
                force: false,
            })
            .await;
        assert!(first.success, "{}", first.message);
        assert!(vault.exists(ProviderId::Anthropic).await);

        let same = keys
            .rotate(&RotateKeyRequest {
                provider: "anthropic".into(),
                new_key: format!("sk-ant-{}", "a".repeat(30)),
                force: true,
            })
            .await;
        assert!(!same.success);
        assert!(same.message.contains("identical"));

        let refused = keys
            .rotate(&RotateKeyRequest {
                provider: "anthropic".into(),
                new_key: format!("sk-ant-{}", "b".repeat(30)),
                force: false,
            })
            .await;
        assert!(!refused.success);
        assert!(refused.message.contains("already exists"));
    }

    #[test]
    fn test_rotate_request_force_defaults_true() {
        let req: RotateKeyRequest =
            serde_json::from_str(r#"{"provider":"openai","new_key":"x"}"#).unwrap();
        assert!(req.force);
    }

    #[test]
    fn test_validate_only() {
        let (keys, _, _) = service();
        let ok = keys.validate(&ValidateKeyRequest {
            provider: "openai".into(),
            api_key: openai_key(),
        });
        assert!(ok.valid);
        assert_eq!(ok.status, KeyStatus::Valid);

        let empty = keys.validate(&ValidateKeyRequest {
            provider: "openai".into(),
            api_key: String::new(),
        });
        assert_eq!(empty.status, KeyStatus::Missing);

        let custom = keys.validate(&ValidateKeyRequest {
            provider: "deepseek".into(),
            api_key: "abcdefghij0123456789_-".into(),
        });
        assert!(custom.valid);
    }

    #[tokio::test]
    async fn test_delete_and_detect() {
        let (keys, vault, _) = service();
        vault.store(ProviderId::OpenAI, &openai_key()).await.unwrap();
        assert!(keys.delete("openai").await.success);
        assert!(keys.delete("openai").await.success);
        assert!(!keys.delete("nope").await.success);
        assert!(!vault.exists(ProviderId::OpenAI).await);

        assert_eq!(keys.detect(&openai_key()), Some(ProviderId::OpenAI));
        assert_eq!(keys.detect("???"), None);
    }

    #[tokio::test]
    async fn test_migrate_all() {
        let (keys, vault, store) = service();
        store.save_option("openai_api_key", &openai_key()).await.unwrap();
        store
            .save_option("api_key", &format!("gsk_{}", "g".repeat(30)))
            .await
            .unwrap();
        let migrated = keys.migrate().await.unwrap();
        assert_eq!(migrated, vec![ProviderId::OpenAI, ProviderId::Groq]);
        assert!(vault.exists(ProviderId::Groq).await);
        assert!(store.load_option("api_key").await.unwrap().is_none());
    }

    #[test]
    fn test_response_from_failure() {
        let outcome = DispatchOutcome {
            success: false,
            output: None,
            provider: None,
            message: Some("All providers failed.".into()),
            attempts: vec![
                GenerationAttempt::failed("openai", "x"),
                GenerationAttempt::failed("groq", "y"),
            ],
            stubbed: false,
        };
        let resp = GenerateResponse::from(outcome);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["tried"], serde_json::json!(["openai", "groq"]));
        assert!(json.get("output").is_none());
    }

    #[test]
    fn test_response_from_success() {
        let outcome = DispatchOutcome {
            success: true,
            output: Some("code".into()),
            provider: Some(ProviderId::Mistral),
            message: None,
            attempts: vec![GenerationAttempt::succeeded("mistral", "code")],
            stubbed: false,
        };
        let json = serde_json::to_value(GenerateResponse::from(outcome)).unwrap();
        assert_eq!(json["provider"], "mistral");
        assert!(json.get("tried").is_none());
        assert!(json.get("message").is_none());
    }
}
