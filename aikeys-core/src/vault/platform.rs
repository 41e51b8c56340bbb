//! OS keyring vault.
//!
//! Dispatches to the platform credential store through the `keyring` crate
//! (Keychain on macOS, Credential Manager on Windows, Secret Service on
//! Linux). Keyring calls block, so each one runs on the blocking pool.

use async_trait::async_trait;
use tracing::debug;

use super::{SecretVault, VaultError};
use crate::ApiKey;

/// Service namespace for this application's keyring entries.
pub const DEFAULT_SERVICE: &str = "AIKeys";

/// Vault backed by the system keyring.
#[derive(Debug, Clone)]
pub struct KeyringVault {
    service: String,
}

impl KeyringVault {
    /// Create a vault that stores entries under `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The keyring service namespace.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Whether an OS keyring backend was compiled in (`native-keyring` feature).
    ///
    /// Without one, `keyring` falls back to a per-entry mock that never
    /// persists, and every verified write fails.
    pub const fn is_supported() -> bool {
        cfg!(feature = "native-keyring")
    }
}

impl Default for KeyringVault {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

fn entry(service: &str, account: &str) -> Result<keyring::Entry, VaultError> {
    keyring::Entry::new(service, account).map_err(|e| VaultError::Backend(e.to_string()))
}

fn backend_error(account: &str, e: keyring::Error) -> VaultError {
    match e {
        keyring::Error::NoEntry => VaultError::NotFound(account.to_string()),
        other => VaultError::Backend(other.to_string()),
    }
}

/// Write `secret` and read it back through a fresh entry.
///
/// Backends that only hold the value per entry instance report success on
/// write but never persist; the read-back turns that into an error.
fn write_verified(service: &str, account: &str, secret: &str) -> Result<(), VaultError> {
    entry(service, account)?
        .set_password(secret)
        .map_err(|e| backend_error(account, e))?;

    match entry(service, account)?.get_password() {
        Ok(stored) if stored == secret => Ok(()),
        Ok(_) => Err(VaultError::Backend(
            "keyring verification failed: stored value mismatch".to_string(),
        )),
        Err(keyring::Error::NoEntry) => Err(VaultError::Backend(
            "keyring verification failed: value not persisted".to_string(),
        )),
        Err(e) => Err(VaultError::Backend(format!(
            "keyring verification failed: {e}"
        ))),
    }
}

async fn blocking<T, F>(f: F) -> Result<T, VaultError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, VaultError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Backend(e.to_string()))?
}

#[async_trait]
impl SecretVault for KeyringVault {
    async fn save(&self, account: &str, secret: &ApiKey) -> Result<(), VaultError> {
        let service = self.service.clone();
        let account = account.to_string();
        let secret = secret.clone();

        blocking(move || {
            write_verified(&service, &account, secret.expose_secret())?;
            debug!(account = %account, "stored secret in keyring");
            Ok(())
        })
        .await
    }

    async fn get(&self, account: &str) -> Result<ApiKey, VaultError> {
        let service = self.service.clone();
        let account = account.to_string();

        blocking(move || {
            entry(&service, &account)?
                .get_password()
                .map(ApiKey::new)
                .map_err(|e| backend_error(&account, e))
        })
        .await
    }

    async fn update(&self, account: &str, secret: &ApiKey) -> Result<(), VaultError> {
        let service = self.service.clone();
        let account = account.to_string();
        let secret = secret.clone();

        blocking(move || {
            // Keyring writes are upserts; require the entry so update never creates one.
            entry(&service, &account)?
                .get_password()
                .map_err(|e| backend_error(&account, e))?;
            write_verified(&service, &account, secret.expose_secret())?;
            debug!(account = %account, "updated secret in keyring");
            Ok(())
        })
        .await
    }

    async fn delete(&self, account: &str) -> Result<(), VaultError> {
        let service = self.service.clone();
        let account = account.to_string();

        blocking(move || match entry(&service, &account)?.delete_credential() {
            Ok(()) => {
                debug!(account = %account, "deleted secret from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account = %account, "no keyring entry to delete");
                Ok(())
            }
            Err(e) => Err(VaultError::Backend(e.to_string())),
        })
        .await
    }

    fn item_id(&self, account: &str) -> String {
        format!("{account} - {}", self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_application_service() {
        let vault = KeyringVault::default();
        assert_eq!(vault.service(), "AIKeys");
    }

    #[test]
    fn item_id_combines_account_and_service() {
        let vault = KeyringVault::new("test-service");
        assert_eq!(vault.item_id("abc"), "abc - test-service");
    }

    #[cfg(not(feature = "native-keyring"))]
    #[tokio::test]
    async fn mock_backend_writes_are_rejected() {
        assert!(!KeyringVault::is_supported());

        let vault = KeyringVault::new("aikeys-test");
        let err = vault.save("acct", &ApiKey::new("sk")).await.unwrap_err();
        assert!(matches!(err, VaultError::Backend(_)));
    }

    #[test]
    fn no_entry_maps_to_not_found() {
        let err = backend_error("acct", keyring::Error::NoEntry);
        assert_eq!(err, VaultError::NotFound("acct".to_string()));
    }
}
