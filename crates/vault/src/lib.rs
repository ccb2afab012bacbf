//! Credential vault for provider API keys.
//!
//! - [`cipher`]: AES-256-CBC at-rest encryption with a derived key.
//! - [`rules`]: per-provider key format validation and provider detection.
//! - [`vault`]: the store/fetch/rotate/delete lifecycle over a
//!   [`SecretStore`](novax_types::SecretStore).

pub mod cipher;
pub mod rules;
pub mod vault;

pub use cipher::KeyCipher;
pub use rules::{Rule, RuleSet, looks_masked};
pub use vault::{CredentialVault, SHARED_LEGACY_OPTION, legacy_option_name, mask};
