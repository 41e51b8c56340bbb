//! Credential store and validation for AI provider API keys.
//!
//! This crate provides:
//! - A vault adapter over the platform keyring for secret values
//! - A provider registry that resolves provider names to endpoints
//! - A credential store that keeps vault secrets and the metadata index consistent
//! - A validation engine that checks keys against the provider's `/models` endpoint
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  ValidationEngine                    │
//! │      (background tasks, sequence-number tickets)     │
//! └─────────────────────────────────────────────────────┘
//!                          │ complete_validation
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                  CredentialStore                     │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  │
//! │  │ SecretVault │  │MetadataIndex│  │  Provider   │  │
//! │  │ (keyring)   │  │ (JSON file) │  │  Registry   │  │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  │
//! └─────────────────────────────────────────────────────┘
//! ```

mod error;
mod secret;

pub mod config;
pub mod index;
pub mod providers;
pub mod store;
pub mod validation;
pub mod vault;

use std::sync::Arc;

pub use config::{AikeysConfig, ConfigLoader, VaultBackend};
pub use error::{ConfigError, Error, Result};
pub use index::{FileSettingsStore, MemorySettingsStore, MetadataIndex, SettingsStore};
pub use providers::{Provider, ProviderId, ProviderRegistry, ProviderResolution};
pub use secret::ApiKey;
pub use store::{
    AvailableModel, Credential, CredentialId, CredentialMetadata, CredentialStore,
    CredentialSummary, IntegrityIssue, StoreError, StoreEvent, ValidationStatus,
    ValidationTicket,
};
pub use validation::{
    CredentialVerifier, HttpVerifier, ValidationEngine, ValidationError, ValidationHandle,
    ValidationOutcome, ValidationReport,
};
pub use vault::{KeyringVault, MemoryVault, SecretVault, VaultError};

/// A wired-up store and engine ready for use by a host application.
pub struct Services {
    pub store: Arc<CredentialStore>,
    pub engine: ValidationEngine,
}

/// Build the store and validation engine described by `config`.
///
/// Loads the metadata index from `config.storage.data_dir`. The index is
/// read once here; vault entries are only touched on demand.
///
/// The keyring backend requires the `native-keyring` feature; without it
/// this returns [`ConfigError::Invalid`] instead of a store that cannot save.
pub async fn bootstrap(config: &AikeysConfig) -> Result<Services> {
    let vault: Arc<dyn SecretVault> = match config.vault.backend {
        VaultBackend::Keyring if !KeyringVault::is_supported() => {
            return Err(ConfigError::Invalid(
                "vault.backend = \"keyring\" needs aikeys-core built with the \"native-keyring\" feature; \
                 enable it or set vault.backend = \"memory\""
                    .to_string(),
            )
            .into());
        }
        VaultBackend::Keyring => Arc::new(KeyringVault::new(&config.vault.service)),
        VaultBackend::Memory => Arc::new(MemoryVault::new()),
    };

    let settings = Arc::new(FileSettingsStore::new(&config.storage.data_dir));
    let index = MetadataIndex::new(settings);
    let registry = ProviderRegistry::builtin().with_overrides(config.provider_entries());

    let store = Arc::new(CredentialStore::open(vault, index, registry).await?);
    let verifier = HttpVerifier::new(config.validation.timeout())?;
    let engine = ValidationEngine::new(Arc::new(verifier));

    tracing::info!(
        data_dir = %config.storage.data_dir.display(),
        backend = ?config.vault.backend,
        credentials = store.len().await,
        "aikeys store ready"
    );

    Ok(Services { store, engine })
}
