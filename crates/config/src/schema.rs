use novax_types::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// Per-provider overrides.
///
/// Every field is optional; unset fields fall back to the adapter's built-in
/// endpoint and model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this provider may be dispatched to (defaults to `true`).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Legacy plaintext API key, consulted only when the `config` credential
    /// source is part of the chain.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier sent in the request body.
    #[serde(default)]
    pub model: Option<String>,
    /// Completion endpoint URL.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Return a canned placeholder instead of failing when no key resolves.
    #[serde(default)]
    pub stub_when_missing: Option<bool>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            model: None,
            endpoint: None,
            temperature: None,
            max_tokens: None,
            stub_when_missing: None,
        }
    }
}

/// Supported provider list and alias map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_supported")]
    pub supported: Vec<ProviderId>,
    #[serde(default = "default_aliases")]
    pub aliases: HashMap<String, String>,
}

fn default_supported() -> Vec<ProviderId> {
    ProviderId::all().to_vec()
}

fn default_aliases() -> HashMap<String, String> {
    HashMap::from([
        ("claude".to_string(), "anthropic".to_string()),
        ("google".to_string(), "gemini".to_string()),
    ])
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            supported: default_supported(),
            aliases: default_aliases(),
        }
    }
}

/// A named place the dispatcher may look for a provider key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSourceKind {
    /// Encrypted vault entry for the provider.
    Vault,
    /// Legacy plaintext option `<provider>_api_key`.
    ProviderOption,
    /// Legacy plaintext option `api_key` shared by all providers.
    SharedOption,
    /// `providers.<slug>.api_key` from this configuration.
    Config,
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Providers tried after the preferred one, in order.
    #[serde(default = "default_fallback_chain")]
    pub fallback_chain: Vec<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// System instruction sent with every prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Credential lookup precedence.
    #[serde(default = "default_credential_sources")]
    pub credential_sources: Vec<CredentialSourceKind>,
}

fn default_fallback_chain() -> Vec<String> {
    ["openai", "groq", "mistral", "anthropic"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_system_prompt() -> String {
    "You are an expert WordPress theme developer. Generate complete, production-ready theme \
     code for the user's request. Return the contents of style.css (with a valid theme header), \
     functions.php and index.php, each introduced by a line of the form `=== filename ===`. \
     Do not include explanations outside the code."
        .to_string()
}

fn default_credential_sources() -> Vec<CredentialSourceKind> {
    vec![
        CredentialSourceKind::Vault,
        CredentialSourceKind::ProviderOption,
        CredentialSourceKind::SharedOption,
    ]
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fallback_chain: default_fallback_chain(),
            timeout_secs: default_timeout_secs(),
            system_prompt: default_system_prompt(),
            credential_sources: default_credential_sources(),
        }
    }
}

/// How credentials are protected at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CipherMode {
    #[default]
    #[serde(rename = "aes-256-cbc")]
    Aes256Cbc,
    /// Reversible base64 only. Not confidential; opt-in for hosts that
    /// cannot keep an operator secret.
    #[serde(rename = "obfuscate")]
    Obfuscate,
}

/// Vault settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Operator secret the encryption key is derived from.
    #[serde(default)]
    pub encryption_key: Option<String>,
    #[serde(default)]
    pub cipher: CipherMode,
}

/// Site constants used for the fallback key derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_url")]
    pub url: String,
    #[serde(default)]
    pub salt: String,
}

fn default_site_url() -> String {
    "http://localhost".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_site_url(),
            salt: String::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"novax_engine=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Optional log file; rotated daily.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Per-provider overrides keyed by canonical slug (`anthropic`, not
    /// `claude`). Registry aliases only apply to provider names in requests.
    #[serde(default)]
    pub providers: HashMap<ProviderId, ProviderConfig>,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// `SQLite` database path (defaults to `~/.novax/novax.db`).
    #[serde(default)]
    pub database: Option<PathBuf>,
}

impl Config {
    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Format as _, Serialized, Yaml},
        };
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
    }

    /// Loads configuration from a file path, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: &Path) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Format as _, Serialized, Yaml},
        };
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .extract()
    }

    /// Loads defaults, then the optional YAML file, then `NOVAX_*` environment
    /// variables (`__` separates nesting, e.g. `NOVAX_VAULT__ENCRYPTION_KEY`).
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if any layer fails to parse.
    #[allow(clippy::result_large_err)]
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Env, Format as _, Serialized, Yaml},
        };
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed("NOVAX_").split("__"))
            .extract()
    }

    /// Returns the effective settings for a provider.
    #[must_use]
    pub fn provider(&self, id: ProviderId) -> ProviderConfig {
        self.providers.get(&id).cloned().unwrap_or_default()
    }

    /// Whether the provider answers with a canned placeholder when no key is
    /// configured.
    ///
    /// Anthropic, Groq and Mistral default to `true`; the rest to `false`.
    #[must_use]
    pub fn stub_when_missing(&self, id: ProviderId) -> bool {
        self.providers
            .get(&id)
            .and_then(|p| p.stub_when_missing)
            .unwrap_or(matches!(
                id,
                ProviderId::Anthropic | ProviderId::Groq | ProviderId::Mistral
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
providers:
  openai:
    model: "gpt-4o"
    stub_when_missing: true
  cohere:
    enabled: false
dispatch:
  fallback_chain: ["groq", "claude"]
  timeout_secs: 15
vault:
  encryption_key: "operator-secret"
  cipher: "obfuscate"
log:
  level: "debug"
  format: "json"
"#;

    #[test]
    fn test_default_config() {
        let c = Config::default();
        assert!(c.providers.is_empty());
        assert_eq!(c.dispatch.timeout_secs, 60);
        assert_eq!(
            c.dispatch.fallback_chain,
            vec!["openai", "groq", "mistral", "anthropic"]
        );
        assert_eq!(c.registry.supported.len(), 6);
        assert_eq!(c.registry.aliases["claude"], "anthropic");
        assert_eq!(c.vault.cipher, CipherMode::Aes256Cbc);
        assert_eq!(c.dispatch.credential_sources.len(), 3);
    }

    #[test]
    fn test_from_yaml_provider_overrides() {
        let c = Config::from_yaml(SAMPLE_YAML).unwrap();
        let openai = c.provider(ProviderId::OpenAI);
        assert_eq!(openai.model.as_deref(), Some("gpt-4o"));
        assert!(openai.enabled);
        assert!(!c.provider(ProviderId::Cohere).enabled);
    }

    #[test]
    fn test_from_yaml_dispatch_and_vault() {
        let c = Config::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(c.dispatch.fallback_chain, vec!["groq", "claude"]);
        assert_eq!(c.dispatch.timeout_secs, 15);
        assert_eq!(c.vault.encryption_key.as_deref(), Some("operator-secret"));
        assert_eq!(c.vault.cipher, CipherMode::Obfuscate);
        assert_eq!(c.log.format, LogFormat::Json);
    }

    #[test]
    fn test_from_yaml_defaults_applied() {
        let c = Config::from_yaml("dispatch:\n  timeout_secs: 5\n").unwrap();
        assert_eq!(c.dispatch.timeout_secs, 5);
        assert_eq!(c.dispatch.fallback_chain.len(), 4);
        assert_eq!(c.site.url, "http://localhost");
    }

    #[test]
    fn test_stub_defaults() {
        let c = Config::default();
        assert!(!c.stub_when_missing(ProviderId::OpenAI));
        assert!(c.stub_when_missing(ProviderId::Anthropic));
        assert!(c.stub_when_missing(ProviderId::Groq));
        assert!(c.stub_when_missing(ProviderId::Mistral));
        assert!(!c.stub_when_missing(ProviderId::Gemini));
        assert!(!c.stub_when_missing(ProviderId::Cohere));
    }

    #[test]
    fn test_stub_override() {
        let c = Config::from_yaml(SAMPLE_YAML).unwrap();
        assert!(c.stub_when_missing(ProviderId::OpenAI));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("novax.yaml");
        std::fs::write(&path, SAMPLE_YAML).unwrap();
        let c = Config::from_file(&path).unwrap();
        assert_eq!(c.dispatch.timeout_secs, 15);
    }

    #[test]
    fn test_load_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("novax.yaml", SAMPLE_YAML)?;
            jail.set_env("NOVAX_DISPATCH__TIMEOUT_SECS", "7");
            jail.set_env("NOVAX_VAULT__ENCRYPTION_KEY", "from-env");
            let c = Config::load(Some(Path::new("novax.yaml")))?;
            assert_eq!(c.dispatch.timeout_secs, 7);
            assert_eq!(c.vault.encryption_key.as_deref(), Some("from-env"));
            assert_eq!(c.dispatch.fallback_chain, vec!["groq", "claude"]);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_cipher_rejected() {
        assert!(Config::from_yaml("vault:\n  cipher: rot13\n").is_err());
    }

    #[test]
    fn test_provider_keys_must_be_canonical() {
        assert!(Config::from_yaml("providers:\n  claude:\n    model: x\n").is_err());
        let config = Config::from_yaml("providers:\n  anthropic:\n    model: x\n").unwrap();
        assert_eq!(
            config.provider(ProviderId::Anthropic).model.as_deref(),
            Some("x")
        );
    }
}
