//! Dispatch layer: credential resolution, provider fallback and the entry
//! points exposed to request handlers.

pub mod api;
pub mod dispatch;
pub mod engine;
pub mod sources;
pub mod usage;

pub use api::{
    GenerateRequest, GenerateResponse, KeyActionResponse, KeyService, ProviderKeyStatus,
    RotateKeyRequest, SaveKeyRequest, ValidateKeyRequest, ValidateKeyResponse,
};
pub use dispatch::{ALL_FAILED_MESSAGE, DispatchOutcome, Dispatcher, ProviderPolicy, stub_output};
pub use engine::Engine;
pub use sources::{
    ConfigSource, CredentialChain, CredentialSource, ProviderOptionSource, SharedOptionSource,
    VaultSource,
};
pub use usage::{ProviderStats, UsageSnapshot, UsageStats};
