//! In-memory settings store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{IndexError, SettingsStore};

/// Map-backed settings store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
