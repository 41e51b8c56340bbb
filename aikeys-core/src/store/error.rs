//! Credential store error types.

use thiserror::Error;

use super::CredentialId;
use crate::index::IndexError;
use crate::vault::VaultError;

/// Errors from credential store operations.
///
/// `NotFound` means no metadata exists for the id. `MissingSecret` means
/// metadata exists but the vault has no secret for it, which is corruption
/// and is never reported as absence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential not found: {0}")]
    NotFound(CredentialId),

    #[error("credential {0} has metadata but no secret in the vault")]
    MissingSecret(CredentialId),

    #[error("vault operation failed: {0}")]
    Vault(#[from] VaultError),

    #[error("metadata index operation failed: {0}")]
    Index(#[from] IndexError),

    #[error("credential {id} is inconsistent: {reason}")]
    Inconsistent { id: CredentialId, reason: String },
}

impl StoreError {
    /// Map a vault error for an existing credential, treating a missing
    /// entry as corruption.
    pub(crate) fn from_vault(id: CredentialId, err: VaultError) -> Self {
        match err {
            VaultError::NotFound(_) => Self::MissingSecret(id),
            other => Self::Vault(other),
        }
    }

    /// Whether the error signals vault/index disagreement.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::MissingSecret(_) | Self::Inconsistent { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_vault_entry_is_corruption_not_absence() {
        let id = CredentialId::new();
        let err = StoreError::from_vault(id, VaultError::NotFound(id.account()));
        assert!(matches!(err, StoreError::MissingSecret(got) if got == id));
        assert!(err.is_corruption());
    }

    #[test]
    fn backend_failure_stays_vault_error() {
        let id = CredentialId::new();
        let err = StoreError::from_vault(id, VaultError::Backend("locked".into()));
        assert!(matches!(err, StoreError::Vault(VaultError::Backend(_))));
        assert!(!err.is_corruption());
    }
}
