//! Sequential fallback across providers.
//!
//! One dispatch builds a de-duplicated trial order (preferred provider first,
//! then the configured fallback chain) and tries each candidate in turn. The
//! first success ends the run. Expected failures never escape as errors: they
//! become [`GenerationAttempt`] records and the chain moves on.

use crate::sources::CredentialChain;
use futures::FutureExt as _;
use novax_config::Config;
use novax_provider::{ProviderRegistry, sanitize_prompt};
use novax_types::{GenerationAttempt, NovaError, ProviderAdapter, ProviderId, UsageSink};
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Terminal message when every candidate failed.
pub const ALL_FAILED_MESSAGE: &str = "All providers failed.";

/// Per-provider dispatch switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPolicy {
    pub enabled: bool,
    /// Answer with a canned placeholder when no key resolves.
    pub stub_when_missing: bool,
}

impl Default for ProviderPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            stub_when_missing: false,
        }
    }
}

/// Result of one dispatch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub output: Option<String>,
    pub provider: Option<ProviderId>,
    pub message: Option<String>,
    /// Every attempt in order, including the successful one.
    pub attempts: Vec<GenerationAttempt>,
    /// The output is a placeholder, not a provider completion.
    pub stubbed: bool,
}

impl DispatchOutcome {
    fn succeeded(
        provider: ProviderId,
        output: String,
        attempts: Vec<GenerationAttempt>,
        stubbed: bool,
    ) -> Self {
        Self {
            success: true,
            output: Some(output),
            provider: Some(provider),
            message: None,
            attempts,
            stubbed,
        }
    }

    fn failed(message: impl Into<String>, attempts: Vec<GenerationAttempt>) -> Self {
        Self {
            success: false,
            output: None,
            provider: None,
            message: Some(message.into()),
            attempts,
            stubbed: false,
        }
    }

    /// Names of every provider attempted, in order.
    #[must_use]
    pub fn tried(&self) -> Vec<String> {
        self.attempts.iter().map(|a| a.provider.clone()).collect()
    }
}

/// Canned response for stub-enabled providers without a key.
#[must_use]
pub fn stub_output(provider: ProviderId, prompt: &str) -> String {
    let summary: String = prompt.chars().take(80).collect();
    format!(
        "=== style.css ===\n/*\nTheme Name: Novax Placeholder\nDescription: Simulated {label} response. Configure an API key for real output.\n*/\n\n\
         === functions.php ===\n<?php\n// Placeholder theme generated without a {label} API key.\n// Request: {summary}\n\n\
         === index.php ===\n<?php get_header(); ?>\n<main><p>Placeholder theme.</p></main>\n<?php get_footer(); ?>",
        label = provider.label(),
    )
}

/// Tries providers in order until one produces output.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
    credentials: CredentialChain,
    fallback_chain: Vec<String>,
    policies: HashMap<ProviderId, ProviderPolicy>,
    usage: Option<Arc<dyn UsageSink>>,
}

impl Dispatcher {
    /// A dispatcher with the default fallback chain and no stub providers.
    #[must_use]
    pub fn new(
        registry: Arc<ProviderRegistry>,
        adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
        credentials: CredentialChain,
    ) -> Self {
        Self {
            registry,
            adapters,
            credentials,
            fallback_chain: novax_config::DispatchConfig::default().fallback_chain,
            policies: HashMap::new(),
            usage: None,
        }
    }

    /// Applies the fallback chain and per-provider policies from `config`.
    #[must_use]
    pub fn configured(mut self, config: &Config) -> Self {
        self.fallback_chain.clone_from(&config.dispatch.fallback_chain);
        for &p in ProviderId::all() {
            let policy = ProviderPolicy {
                enabled: config.provider(p).enabled,
                stub_when_missing: config.stub_when_missing(p),
            };
            self.policies.insert(p, policy);
        }
        self
    }

    #[must_use]
    pub fn with_fallback_chain(mut self, chain: Vec<String>) -> Self {
        self.fallback_chain = chain;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, provider: ProviderId, policy: ProviderPolicy) -> Self {
        self.policies.insert(provider, policy);
        self
    }

    #[must_use]
    pub fn with_usage_sink(mut self, sink: Arc<dyn UsageSink>) -> Self {
        self.usage = Some(sink);
        self
    }

    fn policy(&self, provider: ProviderId) -> ProviderPolicy {
        self.policies.get(&provider).copied().unwrap_or_default()
    }

    /// Normalised, de-duplicated candidate names: `preferred` first, then the
    /// fallback chain.
    #[must_use]
    pub fn trial_order(&self, preferred: Option<&str>) -> Vec<String> {
        let mut seen = HashSet::new();
        preferred
            .into_iter()
            .chain(self.fallback_chain.iter().map(String::as_str))
            .map(|name| self.registry.normalize(name))
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Runs the fallback chain for `prompt`.
    pub async fn dispatch(&self, prompt: &str, preferred: Option<&str>) -> DispatchOutcome {
        let prompt = match sanitize_prompt(prompt) {
            Ok(p) => p,
            Err(e) => return DispatchOutcome::failed(e.to_string(), Vec::new()),
        };

        let order = self.trial_order(preferred);
        let mut attempts: Vec<GenerationAttempt> = Vec::with_capacity(order.len());
        let mut attempted: HashSet<String> = HashSet::new();

        for name in order {
            if !attempted.insert(name.clone()) {
                continue;
            }

            let Some(provider) = self.registry.resolve(&name) else {
                tracing::warn!(provider = %name, "skipping unsupported provider");
                let reason = NovaError::UnsupportedProvider(name.clone()).to_string();
                attempts.push(GenerationAttempt::failed(name, reason));
                continue;
            };
            let policy = self.policy(provider);
            if !policy.enabled {
                tracing::debug!(%provider, "skipping disabled provider");
                let reason = NovaError::ProviderDisabled(name.clone()).to_string();
                attempts.push(GenerationAttempt::failed(name, reason));
                continue;
            }
            let Some(adapter) = self.adapters.get(&provider) else {
                attempts.push(GenerationAttempt::failed(name, "no adapter configured"));
                continue;
            };

            let Some((key, source)) = self.credentials.resolve(provider).await else {
                if policy.stub_when_missing {
                    tracing::info!(%provider, "no API key; returning simulated response");
                    let output = stub_output(provider, &prompt);
                    attempts.push(GenerationAttempt::succeeded(name, output.clone()));
                    return DispatchOutcome::succeeded(provider, output, attempts, true);
                }
                tracing::warn!(%provider, "API key missing");
                let reason = NovaError::MissingKey(name.clone()).to_string();
                attempts.push(GenerationAttempt::failed(name, reason));
                continue;
            };

            let call = AssertUnwindSafe(adapter.generate(&prompt, &key)).catch_unwind();
            match call.await {
                Ok(Ok(generation)) => {
                    let tokens = generation.usage.map_or(0, |u| u.total());
                    if let Some(sink) = &self.usage {
                        sink.record(provider, tokens);
                    }
                    tracing::info!(
                        %provider,
                        key_source = source,
                        tokens,
                        attempts = attempts.len() + 1,
                        "generation succeeded"
                    );
                    attempts.push(GenerationAttempt::succeeded(name, generation.output.clone()));
                    return DispatchOutcome::succeeded(provider, generation.output, attempts, false);
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        %provider,
                        error = %e,
                        retryable = e.is_retryable(),
                        "provider attempt failed"
                    );
                    self.record_failure(provider);
                    attempts.push(GenerationAttempt::failed(name, e.to_string()));
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    tracing::error!(%provider, reason = %reason, "provider adapter panicked");
                    self.record_failure(provider);
                    attempts.push(GenerationAttempt::failed(
                        name,
                        format!("adapter panicked: {reason}"),
                    ));
                }
            }
        }

        tracing::warn!(tried = ?attempts.iter().map(|a| a.provider.as_str()).collect::<Vec<_>>(), "all providers failed");
        DispatchOutcome::failed(ALL_FAILED_MESSAGE, attempts)
    }

    fn record_failure(&self, provider: ProviderId) {
        if let Some(sink) = &self.usage {
            sink.record_failure(provider);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::CredentialSource;
    use crate::usage::UsageStats;
    use async_trait::async_trait;
    use novax_types::{Generation, NovaError, TokenUsage, traits::Result};
    use secrecy::{ExposeSecret, SecretString};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Succeed(&'static str),
        /// Succeeds without reporting token counts.
        SucceedUntallied(&'static str),
        Fail,
        Panic,
    }

    struct FakeAdapter {
        provider: ProviderId,
        script: Script,
        calls: AtomicUsize,
        seen_keys: Mutex<Vec<String>>,
    }

    impl FakeAdapter {
        fn new(provider: ProviderId, script: Script) -> Arc<Self> {
            Arc::new(Self {
                provider,
                script,
                calls: AtomicUsize::new(0),
                seen_keys: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderAdapter for FakeAdapter {
        fn provider(&self) -> ProviderId {
            self.provider
        }

        async fn generate(&self, _prompt: &str, api_key: &SecretString) -> Result<Generation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_keys
                .lock()
                .unwrap()
                .push(api_key.expose_secret().to_string());
            match self.script {
                Script::Succeed(text) => Ok(Generation {
                    output: text.to_string(),
                    usage: Some(TokenUsage::new(10, 20)),
                }),
                Script::SucceedUntallied(text) => Ok(Generation {
                    output: text.to_string(),
                    usage: None,
                }),
                Script::Fail => Err(NovaError::Upstream {
                    status: 500,
                    message: format!("{} down", self.provider),
                }),
                Script::Panic => panic!("adapter bug"),
            }
        }
    }

    /// Yields `key-<slug>` for the listed providers.
    struct FixedKeys(Vec<ProviderId>);

    #[async_trait]
    impl CredentialSource for FixedKeys {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn resolve(&self, provider: ProviderId) -> Option<SecretString> {
            self.0
                .contains(&provider)
                .then(|| SecretString::from(format!("key-{provider}")))
        }
    }

    fn dispatcher(adapters: &[Arc<FakeAdapter>], keyed: &[ProviderId]) -> Dispatcher {
        let map = adapters
            .iter()
            .map(|a| (a.provider, Arc::clone(a) as Arc<dyn ProviderAdapter>))
            .collect();
        let chain = CredentialChain::new(vec![Arc::new(FixedKeys(keyed.to_vec()))]);
        Dispatcher::new(Arc::new(ProviderRegistry::default()), map, chain)
    }

    fn all_keyed() -> Vec<ProviderId> {
        ProviderId::all().to_vec()
    }

    #[test]
    fn test_trial_order_groq_preferred() {
        let d = dispatcher(&[], &[]);
        assert_eq!(
            d.trial_order(Some("groq")),
            vec!["groq", "openai", "mistral", "anthropic"]
        );
    }

    #[test]
    fn test_trial_order_normalizes_and_dedups() {
        let d = dispatcher(&[], &[]).with_fallback_chain(vec![
            "OpenAI".into(),
            "claude".into(),
            "anthropic".into(),
            " openai ".into(),
        ]);
        assert_eq!(
            d.trial_order(Some("Claude")),
            vec!["anthropic", "openai"]
        );
        assert_eq!(d.trial_order(None), vec!["openai", "anthropic"]);
        assert_eq!(d.trial_order(Some("  ")), vec!["openai", "anthropic"]);
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let groq = FakeAdapter::new(ProviderId::Groq, Script::Fail);
        let openai = FakeAdapter::new(ProviderId::OpenAI, Script::Succeed("from openai"));
        let mistral = FakeAdapter::new(ProviderId::Mistral, Script::Succeed("from mistral"));
        let d = dispatcher(&[groq.clone(), openai.clone(), mistral.clone()], &all_keyed());

        let outcome = d.dispatch("make a theme", Some("groq")).await;
        assert!(outcome.success);
        assert_eq!(outcome.provider, Some(ProviderId::OpenAI));
        assert_eq!(outcome.output.as_deref(), Some("from openai"));
        assert!(!outcome.stubbed);
        assert_eq!(groq.calls(), 1);
        assert_eq!(openai.calls(), 1);
        assert_eq!(mistral.calls(), 0);
        assert_eq!(outcome.tried(), vec!["groq", "openai"]);
        assert!(!outcome.attempts[0].success);
        assert!(outcome.attempts[1].success);
    }

    #[tokio::test]
    async fn test_all_fail() {
        let adapters: Vec<_> = [
            ProviderId::OpenAI,
            ProviderId::Groq,
            ProviderId::Mistral,
            ProviderId::Anthropic,
        ]
        .into_iter()
        .map(|p| FakeAdapter::new(p, Script::Fail))
        .collect();
        let d = dispatcher(&adapters, &all_keyed());

        let outcome = d.dispatch("make a theme", Some("openai")).await;
        assert!(!outcome.success);
        assert!(outcome.output.is_none());
        assert_eq!(outcome.message.as_deref(), Some(ALL_FAILED_MESSAGE));
        assert_eq!(
            outcome.tried(),
            vec!["openai", "groq", "mistral", "anthropic"]
        );
        for a in &adapters {
            assert_eq!(a.calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_missing_keys_try_whole_chain() {
        let adapters: Vec<_> = ProviderId::all()
            .iter()
            .map(|&p| FakeAdapter::new(p, Script::Succeed("never")))
            .collect();
        let d = dispatcher(&adapters, &[]).configured(&{
            let mut c = Config::default();
            for p in [ProviderId::Anthropic, ProviderId::Groq, ProviderId::Mistral] {
                c.providers.entry(p).or_default().stub_when_missing = Some(false);
            }
            c
        });

        let outcome = d.dispatch("theme", Some("openai")).await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.tried(),
            vec!["openai", "groq", "mistral", "anthropic"]
        );
        assert!(outcome.attempts.iter().all(|a| {
            a.error_message
                .as_deref()
                .is_some_and(|m| m.starts_with("API key missing"))
        }));
        assert!(adapters.iter().all(|a| a.calls() == 0));
    }

    #[tokio::test]
    async fn test_stub_when_key_missing() {
        let openai = FakeAdapter::new(ProviderId::OpenAI, Script::Succeed("never"));
        let groq = FakeAdapter::new(ProviderId::Groq, Script::Succeed("never"));
        let d = dispatcher(&[openai.clone(), groq.clone()], &[]).configured(&Config::default());

        let outcome = d.dispatch("portfolio", Some("openai")).await;
        assert!(outcome.success);
        assert!(outcome.stubbed);
        assert_eq!(outcome.provider, Some(ProviderId::Groq));
        assert!(outcome.output.as_deref().unwrap().contains("=== style.css ==="));
        assert_eq!(outcome.tried(), vec!["openai", "groq"]);
        assert_eq!(groq.calls(), 0);
    }

    #[tokio::test]
    async fn test_panicking_adapter_is_a_failed_attempt() {
        let openai = FakeAdapter::new(ProviderId::OpenAI, Script::Panic);
        let groq = FakeAdapter::new(ProviderId::Groq, Script::Succeed("recovered"));
        let d = dispatcher(&[openai, groq], &all_keyed());

        let outcome = d.dispatch("theme", None).await;
        assert!(outcome.success);
        assert_eq!(outcome.output.as_deref(), Some("recovered"));
        let first = &outcome.attempts[0];
        assert_eq!(first.provider, "openai");
        assert!(
            first
                .error_message
                .as_deref()
                .unwrap()
                .contains("adapter bug")
        );
    }

    #[tokio::test]
    async fn test_unsupported_and_disabled_recorded() {
        let openai = FakeAdapter::new(ProviderId::OpenAI, Script::Succeed("never"));
        let groq = FakeAdapter::new(ProviderId::Groq, Script::Succeed("groq ok"));
        let d = dispatcher(&[openai.clone(), groq], &all_keyed()).with_policy(
            ProviderId::OpenAI,
            ProviderPolicy {
                enabled: false,
                stub_when_missing: false,
            },
        );

        let outcome = d.dispatch("theme", Some("deepseek")).await;
        assert!(outcome.success);
        assert_eq!(outcome.tried(), vec!["deepseek", "openai", "groq"]);
        assert_eq!(
            outcome.attempts[0].error_message.as_deref(),
            Some("unsupported provider: deepseek")
        );
        assert_eq!(
            outcome.attempts[1].error_message.as_deref(),
            Some("provider disabled: openai")
        );
        assert_eq!(openai.calls(), 0);
    }

    #[tokio::test]
    async fn test_usage_recorded_on_success() {
        let stats = Arc::new(UsageStats::new());
        let groq = FakeAdapter::new(ProviderId::Groq, Script::Fail);
        let openai = FakeAdapter::new(ProviderId::OpenAI, Script::Succeed("ok"));
        let d = dispatcher(&[groq, openai.clone()], &all_keyed())
            .with_usage_sink(stats.clone());

        d.dispatch("theme", Some("groq")).await;
        let snap = stats.snapshot();
        assert_eq!(snap.total_tokens, 30);
        assert_eq!(snap.providers[&ProviderId::OpenAI].success, 1);
        assert_eq!(snap.providers[&ProviderId::Groq].failure, 1);
        assert_eq!(
            *openai.seen_keys.lock().unwrap(),
            vec!["key-openai".to_string()]
        );
    }

    #[tokio::test]
    async fn test_success_without_token_counts_still_counted() {
        let stats = Arc::new(UsageStats::new());
        let openai = FakeAdapter::new(ProviderId::OpenAI, Script::SucceedUntallied("ok"));
        let d = dispatcher(&[openai], &all_keyed()).with_usage_sink(stats.clone());

        let outcome = d.dispatch("theme", None).await;
        assert!(outcome.success);
        let snap = stats.snapshot();
        assert_eq!(snap.success_calls, 1);
        assert_eq!(snap.total_tokens, 0);
        assert_eq!(snap.providers[&ProviderId::OpenAI].success, 1);
    }

    #[tokio::test]
    async fn test_stubbed_success_not_counted() {
        let stats = Arc::new(UsageStats::new());
        let d = dispatcher(&[FakeAdapter::new(ProviderId::Groq, Script::Fail)], &[])
            .with_fallback_chain(vec!["groq".into()])
            .with_policy(
                ProviderId::Groq,
                ProviderPolicy {
                    enabled: true,
                    stub_when_missing: true,
                },
            )
            .with_usage_sink(stats.clone());

        assert!(d.dispatch("theme", None).await.stubbed);
        assert_eq!(stats.snapshot().success_calls, 0);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_without_attempts() {
        let openai = FakeAdapter::new(ProviderId::OpenAI, Script::Succeed("x"));
        let d = dispatcher(&[openai.clone()], &all_keyed());
        let outcome = d.dispatch("  \u{0} ", None).await;
        assert!(!outcome.success);
        assert!(outcome.attempts.is_empty());
        assert_eq!(outcome.message.as_deref(), Some("prompt cannot be empty"));
        assert_eq!(openai.calls(), 0);
    }
}
