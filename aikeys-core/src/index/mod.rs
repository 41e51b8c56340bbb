//! Durable metadata index.
//!
//! The whole metadata collection is serialized to JSON and written under one
//! well-known key of a key-value settings store. Each write replaces the
//! previous value as a single unit.

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::store::CredentialMetadata;

pub use file::FileSettingsStore;
pub use memory::MemorySettingsStore;

/// Settings key holding the metadata collection.
pub const INDEX_KEY: &str = "stored_api_keys";

/// Errors from the metadata index and its settings store.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata index is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("failed to serialize metadata index: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("settings backend error: {0}")]
    Backend(String),
}

/// Simple key-value settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError>;

    /// Replace the value under `key`. Readers see the old or the new value, never a mix.
    async fn store(&self, key: &str, value: &[u8]) -> Result<(), IndexError>;
}

/// The serialized metadata collection.
#[derive(Debug, Clone)]
pub struct MetadataIndex {
    settings: Arc<dyn SettingsStore>,
    key: String,
}

impl MetadataIndex {
    /// Index stored under [`INDEX_KEY`].
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self::with_key(settings, INDEX_KEY)
    }

    /// Index stored under a custom key.
    pub fn with_key(settings: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            settings,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load all records. A missing key is an empty index; an unreadable one is an error.
    pub async fn load(&self) -> Result<Vec<CredentialMetadata>, IndexError> {
        let Some(bytes) = self.settings.load(&self.key).await? else {
            debug!(key = %self.key, "no metadata index yet");
            return Ok(Vec::new());
        };
        let records: Vec<CredentialMetadata> =
            serde_json::from_slice(&bytes).map_err(IndexError::Corrupt)?;
        debug!(key = %self.key, count = records.len(), "loaded metadata index");
        Ok(records)
    }

    /// Write the full collection, replacing what was stored.
    pub async fn save(&self, records: &[CredentialMetadata]) -> Result<(), IndexError> {
        let bytes = serde_json::to_vec_pretty(records).map_err(IndexError::Serialize)?;
        self.settings.store(&self.key, &bytes).await?;
        debug!(key = %self.key, count = records.len(), "wrote metadata index");
        Ok(())
    }
}
