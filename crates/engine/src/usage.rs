//! In-memory usage statistics per provider.

use novax_types::{ProviderId, UsageSink};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide call and token counters.
#[derive(Default)]
pub struct UsageStats {
    /// Successful provider calls.
    pub success_calls: AtomicU64,
    /// Failed provider calls.
    pub failure_calls: AtomicU64,
    /// Total tokens across all successful calls.
    pub total_tokens: AtomicU64,
    providers: Mutex<BTreeMap<ProviderId, ProviderStats>>,
}

/// Per-provider counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub success: u64,
    pub failure: u64,
    pub tokens: u64,
}

/// JSON-serializable snapshot of current usage.
#[derive(Debug, Serialize)]
pub struct UsageSnapshot {
    pub success_calls: u64,
    pub failure_calls: u64,
    pub total_tokens: u64,
    pub providers: BTreeMap<ProviderId, ProviderStats>,
}

impl UsageStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a JSON-serializable snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> UsageSnapshot {
        let providers = self
            .providers
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default();
        UsageSnapshot {
            success_calls: self.success_calls.load(Ordering::Relaxed),
            failure_calls: self.failure_calls.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
            providers,
        }
    }
}

impl UsageSink for UsageStats {
    fn record(&self, provider: ProviderId, tokens: u64) {
        self.success_calls.fetch_add(1, Ordering::Relaxed);
        self.total_tokens.fetch_add(tokens, Ordering::Relaxed);

        if let Ok(mut map) = self.providers.lock() {
            let entry = map.entry(provider).or_default();
            entry.success += 1;
            entry.tokens += tokens;
        }
    }

    fn record_failure(&self, provider: ProviderId) {
        self.failure_calls.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut map) = self.providers.lock() {
            map.entry(provider).or_default().failure += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_success() {
        let stats = UsageStats::new();
        stats.record(ProviderId::OpenAI, 300);
        stats.record(ProviderId::OpenAI, 150);
        stats.record(ProviderId::Groq, 80);

        let snap = stats.snapshot();
        assert_eq!(snap.success_calls, 3);
        assert_eq!(snap.failure_calls, 0);
        assert_eq!(snap.total_tokens, 530);

        let openai = &snap.providers[&ProviderId::OpenAI];
        assert_eq!(openai.success, 2);
        assert_eq!(openai.tokens, 450);
    }

    #[test]
    fn test_record_failure() {
        let stats = UsageStats::new();
        stats.record_failure(ProviderId::Mistral);
        stats.record(ProviderId::Mistral, 10);

        let snap = stats.snapshot();
        assert_eq!(snap.failure_calls, 1);
        assert_eq!(
            snap.providers[&ProviderId::Mistral],
            ProviderStats {
                success: 1,
                failure: 1,
                tokens: 10
            }
        );
    }

    #[test]
    fn test_snapshot_serializes_slugs() {
        let stats = UsageStats::new();
        stats.record(ProviderId::Anthropic, 5);
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["providers"]["anthropic"]["tokens"], 5);
    }

    #[test]
    fn test_snapshot_empty() {
        let snap = UsageStats::new().snapshot();
        assert_eq!(snap.success_calls, 0);
        assert!(snap.providers.is_empty());
    }
}
