//! Storage backends for encrypted provider credentials and legacy options.
//!
//! Provides an in-memory store for testing and a SQLite-backed store for production.

pub mod memory;
pub mod sqlite;

pub use memory::InMemorySecretStore;
pub use sqlite::SqliteSecretStore;
