//! In-memory vault.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SecretVault, VaultError};
use crate::ApiKey;

/// Process-local vault for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryVault {
    secrets: RwLock<HashMap<String, ApiKey>>,
}

impl MemoryVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets.
    pub async fn len(&self) -> usize {
        self.secrets.read().await.len()
    }

    /// Whether the vault holds no secrets.
    pub async fn is_empty(&self) -> bool {
        self.secrets.read().await.is_empty()
    }
}

#[async_trait]
impl SecretVault for MemoryVault {
    async fn save(&self, account: &str, secret: &ApiKey) -> Result<(), VaultError> {
        self.secrets
            .write()
            .await
            .insert(account.to_string(), secret.clone());
        Ok(())
    }

    async fn get(&self, account: &str) -> Result<ApiKey, VaultError> {
        self.secrets
            .read()
            .await
            .get(account)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(account.to_string()))
    }

    async fn update(&self, account: &str, secret: &ApiKey) -> Result<(), VaultError> {
        let mut secrets = self.secrets.write().await;
        match secrets.get_mut(account) {
            Some(existing) => {
                *existing = secret.clone();
                Ok(())
            }
            None => Err(VaultError::NotFound(account.to_string())),
        }
    }

    async fn delete(&self, account: &str) -> Result<(), VaultError> {
        self.secrets.write().await.remove(account);
        Ok(())
    }
}
