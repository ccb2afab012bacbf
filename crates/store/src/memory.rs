//! In-memory secret store backed by `HashMap`s behind a `Mutex`.

use async_trait::async_trait;
use novax_types::{NovaError, SecretStore, traits::Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    credentials: HashMap<String, String>,
    options: HashMap<String, String>,
}

/// An in-memory [`SecretStore`] implementation for testing and ephemeral use.
#[derive(Default)]
pub struct InMemorySecretStore {
    data: Mutex<Tables>,
}

impl InMemorySecretStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.data
            .lock()
            .map_err(|_| NovaError::Storage("in-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn load_credential(&self, provider: &str) -> Result<Option<String>> {
        Ok(self.tables()?.credentials.get(provider).cloned())
    }

    async fn save_credential(&self, provider: &str, blob: &str) -> Result<()> {
        self.tables()?
            .credentials
            .insert(provider.to_string(), blob.to_string());
        Ok(())
    }

    async fn remove_credential(&self, provider: &str) -> Result<()> {
        self.tables()?.credentials.remove(provider);
        Ok(())
    }

    async fn list_credentials(&self) -> Result<Vec<String>> {
        let mut providers: Vec<String> = self.tables()?.credentials.keys().cloned().collect();
        providers.sort();
        Ok(providers)
    }

    async fn load_option(&self, name: &str) -> Result<Option<String>> {
        Ok(self.tables()?.options.get(name).cloned())
    }

    async fn save_option(&self, name: &str, value: &str) -> Result<()> {
        self.tables()?
            .options
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_option(&self, name: &str) -> Result<()> {
        self.tables()?.options.remove(name);
        Ok(())
    }
}
