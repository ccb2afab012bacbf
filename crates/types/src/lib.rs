//! Core types and traits for the novax workspace.
//!
//! This crate defines the shared abstractions used across all layers of the
//! theme-generation dispatcher: the error type, provider identifiers, key
//! validation verdicts, generation results, and the async traits that the
//! store, provider and engine crates implement.

pub mod error;
pub mod generation;
pub mod provider;
pub mod traits;
pub mod validation;

pub use error::NovaError;
pub use generation::{Generation, GenerationAttempt, TokenUsage};
pub use provider::ProviderId;
pub use traits::{ProviderAdapter, SecretStore, UsageSink};
pub use validation::{KeyStatus, ValidationResult};
