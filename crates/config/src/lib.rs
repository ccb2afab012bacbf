//! Configuration loading for novax.
//!
//! Uses figment for YAML-based configuration layered over built-in defaults
//! and `NOVAX_`-prefixed environment variables. Configuration is read once at
//! start-up and treated as immutable afterwards.

pub mod schema;

pub use schema::{
    CipherMode, Config, CredentialSourceKind, DispatchConfig, LogConfig, LogFormat,
    ProviderConfig, RegistryConfig, SiteConfig, VaultConfig,
};
