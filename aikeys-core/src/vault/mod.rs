//! Secure vault adapter.
//!
//! Secret values live only in the vault, keyed by the credential id in
//! string form. The vault has no business logic: it stores, returns,
//! replaces and removes opaque secrets, and every call is fallible I/O.

mod memory;
mod platform;

use async_trait::async_trait;
use thiserror::Error;

use crate::ApiKey;

pub use memory::MemoryVault;
pub use platform::{DEFAULT_SERVICE, KeyringVault};

/// Errors raised by vault backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// No secret stored under the account.
    #[error("no vault entry for account {0}")]
    NotFound(String),

    /// Platform store refused or failed the operation (locked, denied, corrupt).
    #[error("vault backend error: {0}")]
    Backend(String),
}

/// Opaque secret storage keyed by account identifier.
#[async_trait]
pub trait SecretVault: Send + Sync + std::fmt::Debug {
    /// Store a secret. Saving over an existing account replaces it.
    async fn save(&self, account: &str, secret: &ApiKey) -> Result<(), VaultError>;

    /// Fetch a secret. Fails with [`VaultError::NotFound`] if absent.
    async fn get(&self, account: &str) -> Result<ApiKey, VaultError>;

    /// Replace an existing secret. Fails with [`VaultError::NotFound`] if absent.
    async fn update(&self, account: &str, secret: &ApiKey) -> Result<(), VaultError>;

    /// Remove a secret. Removing an absent account succeeds.
    async fn delete(&self, account: &str) -> Result<(), VaultError>;

    /// Human-readable identifier of the vault item backing `account`.
    fn item_id(&self, account: &str) -> String {
        account.to_string()
    }
}
