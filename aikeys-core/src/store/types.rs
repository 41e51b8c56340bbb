//! Credential data model.
//!
//! A credential is split in two: [`CredentialMetadata`] is non-sensitive and
//! goes to the durable index, the secret value goes only to the vault.
//! [`Credential`] is the join of both plus the resolved [`Provider`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::providers::{Provider, ProviderId};
use crate::ApiKey;

/// Stable, globally unique credential identifier.
///
/// Its string form is the vault account name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(Uuid);

impl CredentialId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The vault account name for this credential.
    pub fn account(&self) -> String {
        self.0.to_string()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CredentialId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A model reported by the provider during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableModel {
    pub model_id: String,
    pub owned_by: String,
}

impl AvailableModel {
    pub fn new(model_id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            owned_by: owned_by.into(),
        }
    }
}

/// Non-sensitive half of a credential, as stored in the metadata index.
///
/// `is_validated` and `available_models` mirror the most recent completed
/// validation and are only changed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialMetadata {
    pub id: CredentialId,
    pub name: String,
    #[serde(rename = "provider")]
    pub provider_name: String,
    #[serde(rename = "providerID", default, skip_serializing_if = "Option::is_none")]
    pub provider_ref: Option<ProviderId>,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub is_validated: bool,
    #[serde(default)]
    pub available_models: Vec<AvailableModel>,
}

/// A credential with its secret, fetched from the vault on demand.
#[derive(Debug, Clone)]
pub struct Credential {
    pub metadata: CredentialMetadata,
    pub provider: Provider,
    pub secret: ApiKey,
}

impl Credential {
    pub fn id(&self) -> CredentialId {
        self.metadata.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn secret(&self) -> &ApiKey {
        &self.secret
    }
}

/// Listing view of a credential; never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSummary {
    pub metadata: CredentialMetadata,
    pub provider: Provider,
    pub status: ValidationStatus,
}

/// Validation state of a single credential.
///
/// `Validating` exists only in memory; the index stores the terminal
/// outcome as `isValidated` plus the model list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatus {
    NotValidated,
    Validating,
    Valid { models: Vec<AvailableModel> },
    Invalid { reason: String },
}

impl ValidationStatus {
    /// Status implied by persisted metadata after a restart.
    pub fn from_metadata(metadata: &CredentialMetadata) -> Self {
        if metadata.is_validated {
            Self::Valid {
                models: metadata.available_models.clone(),
            }
        } else {
            Self::NotValidated
        }
    }

    pub fn is_validating(&self) -> bool {
        matches!(self, Self::Validating)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotValidated => write!(f, "not validated"),
            Self::Validating => write!(f, "validating"),
            Self::Valid { models } => write!(f, "valid ({} models)", models.len()),
            Self::Invalid { reason } => write!(f, "invalid: {reason}"),
        }
    }
}

/// Change notification published by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added(CredentialId),
    Updated(CredentialId),
    Removed(CredentialId),
    StatusChanged {
        id: CredentialId,
        status: ValidationStatus,
    },
}

/// A consistency problem found by [`verify_integrity`](super::CredentialStore::verify_integrity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// Metadata exists but the vault has no secret for it.
    MissingSecret(CredentialId),
    /// The vault could not be read for this credential.
    VaultUnavailable { id: CredentialId, reason: String },
}

/// Tag for one validation attempt.
///
/// Tickets are issued with increasing sequence numbers per credential and
/// consumed on completion; only the newest ticket's result is applied.
#[derive(Debug)]
pub struct ValidationTicket {
    pub(crate) id: CredentialId,
    pub(crate) seq: u64,
}

impl ValidationTicket {
    pub fn id(&self) -> CredentialId {
        self.id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}
