//! Credential store.
//!
//! Owns the in-memory collection of credential metadata and keeps it
//! consistent with two backends: the vault (secrets) and the metadata index
//! (everything else). Ordering rules:
//!
//! - `add` writes the secret first; metadata exists only after the vault accepted it.
//! - `update` replaces the secret first; metadata keeps its old value if that fails.
//! - `delete` removes the secret first; metadata stays if that fails.
//! - If the index write fails afterwards, the vault change is undone. When the
//!   undo fails too, the error is [`StoreError::Inconsistent`].
//!
//! All operations run under one async mutex, so there is a single writer.
//! Validation network calls never run while it is held.

mod error;
mod types;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::index::MetadataIndex;
use crate::providers::{Provider, ProviderId, ProviderRegistry, ProviderResolution};
use crate::validation::ValidationOutcome;
use crate::vault::{SecretVault, VaultError};
use crate::ApiKey;

pub use error::StoreError;
pub use types::{
    AvailableModel, Credential, CredentialId, CredentialMetadata, CredentialSummary,
    IntegrityIssue, StoreEvent, ValidationStatus, ValidationTicket,
};

/// Capacity of the change notification channel.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Entry {
    metadata: CredentialMetadata,
    provider: Provider,
    status: ValidationStatus,
    /// Latest validation sequence number issued for this credential.
    seq: u64,
}

impl Entry {
    fn summary(&self) -> CredentialSummary {
        CredentialSummary {
            metadata: self.metadata.clone(),
            provider: self.provider.clone(),
            status: self.status.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<Entry>,
    last_updated: Option<DateTime<Utc>>,
}

impl State {
    fn position(&self, id: CredentialId) -> Option<usize> {
        self.entries.iter().position(|e| e.metadata.id == id)
    }

    fn records(&self) -> Vec<CredentialMetadata> {
        self.entries.iter().map(|e| e.metadata.clone()).collect()
    }
}

/// Credential store over a vault and a metadata index.
pub struct CredentialStore {
    vault: Arc<dyn SecretVault>,
    index: MetadataIndex,
    registry: ProviderRegistry,
    state: Mutex<State>,
    events: broadcast::Sender<StoreEvent>,
}

impl CredentialStore {
    /// Open a store, loading the metadata index.
    ///
    /// The vault is not read here; use [`verify_integrity`](Self::verify_integrity)
    /// to find records whose secret is missing.
    pub async fn open(
        vault: Arc<dyn SecretVault>,
        index: MetadataIndex,
        registry: ProviderRegistry,
    ) -> Result<Self, StoreError> {
        let records = index.load().await?;
        let entries = records
            .into_iter()
            .map(|metadata| {
                let provider = registry
                    .resolve_reference(metadata.provider_ref.as_ref(), &metadata.provider_name)
                    .into_provider();
                Entry {
                    status: ValidationStatus::from_metadata(&metadata),
                    metadata,
                    provider,
                    seq: 0,
                }
            })
            .collect::<Vec<_>>();

        info!(count = entries.len(), "opened credential store");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            vault,
            index,
            registry,
            state: Mutex::new(State {
                entries,
                last_updated: None,
            }),
            events,
        })
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Add a credential. The secret is written to the vault before any metadata exists.
    pub async fn add(
        &self,
        name: &str,
        provider_name: &str,
        secret: ApiKey,
        provider_ref: Option<ProviderId>,
    ) -> Result<Credential, StoreError> {
        let mut state = self.state.lock().await;

        let mut id = CredentialId::new();
        while state.position(id).is_some() {
            id = CredentialId::new();
        }
        let account = id.account();

        let provider = self.resolve(provider_ref.as_ref(), provider_name);

        if let Err(e) = self.vault.save(&account, &secret).await {
            warn!(credential_id = %id, error = %e, "vault rejected new secret, credential not added");
            return Err(e.into());
        }

        let metadata = CredentialMetadata {
            id,
            name: name.to_string(),
            provider_name: provider_name.to_string(),
            provider_ref: Some(provider.id.clone()),
            date_added: Utc::now(),
            is_validated: false,
            available_models: Vec::new(),
        };
        state.entries.push(Entry {
            metadata: metadata.clone(),
            provider: provider.clone(),
            status: ValidationStatus::NotValidated,
            seq: 0,
        });

        if let Err(e) = self.persist(&mut state).await {
            state.entries.pop();
            warn!(credential_id = %id, error = %e, "index write failed, removing new secret");
            if let Err(cleanup) = self.vault.delete(&account).await {
                return Err(StoreError::Inconsistent {
                    id,
                    reason: format!(
                        "index write failed ({e}) and the new secret could not be removed ({cleanup})"
                    ),
                });
            }
            return Err(e.into());
        }
        drop(state);

        info!(credential_id = %id, provider = %provider.name, "credential added");
        self.notify(StoreEvent::Added(id));

        Ok(Credential {
            metadata,
            provider,
            secret,
        })
    }

    /// Get a credential with its secret.
    ///
    /// Returns `Ok(None)` if no metadata exists and
    /// [`StoreError::MissingSecret`] if metadata exists without a secret.
    pub async fn get(&self, id: CredentialId) -> Result<Option<Credential>, StoreError> {
        let state = self.state.lock().await;
        let Some(index) = state.position(id) else {
            return Ok(None);
        };
        let entry = &state.entries[index];

        let secret = self
            .vault
            .get(&id.account())
            .await
            .map_err(|e| self.vault_failure(id, e))?;

        Ok(Some(Credential {
            metadata: entry.metadata.clone(),
            provider: entry.provider.clone(),
            secret,
        }))
    }

    /// Replace name, provider and secret.
    ///
    /// `date_added` and the last validation result are kept; an update does
    /// not revalidate. In-flight validations for the credential are superseded.
    pub async fn update(
        &self,
        id: CredentialId,
        name: &str,
        provider_name: &str,
        secret: ApiKey,
        provider_ref: Option<ProviderId>,
    ) -> Result<Credential, StoreError> {
        let mut state = self.state.lock().await;
        let index = state.position(id).ok_or(StoreError::NotFound(id))?;
        let account = id.account();

        let previous_secret = self
            .vault
            .get(&account)
            .await
            .map_err(|e| self.vault_failure(id, e))?;

        let provider = self.resolve(provider_ref.as_ref(), provider_name);

        if let Err(e) = self.vault.update(&account, &secret).await {
            warn!(credential_id = %id, error = %e, "vault update failed, credential unchanged");
            return Err(StoreError::from_vault(id, e));
        }

        let previous = state.entries[index].clone();
        let metadata = CredentialMetadata {
            id,
            name: name.to_string(),
            provider_name: provider_name.to_string(),
            provider_ref: Some(provider.id.clone()),
            date_added: previous.metadata.date_added,
            is_validated: previous.metadata.is_validated,
            available_models: previous.metadata.available_models.clone(),
        };
        let status = if previous.status.is_validating() {
            ValidationStatus::from_metadata(&metadata)
        } else {
            previous.status.clone()
        };
        state.entries[index] = Entry {
            metadata: metadata.clone(),
            provider: provider.clone(),
            status,
            seq: previous.seq + 1,
        };

        if let Err(e) = self.persist(&mut state).await {
            state.entries[index] = Entry {
                seq: previous.seq + 1,
                ..previous
            };
            warn!(credential_id = %id, error = %e, "index write failed, restoring previous secret");
            if let Err(restore) = self.vault.update(&account, &previous_secret).await {
                return Err(StoreError::Inconsistent {
                    id,
                    reason: format!(
                        "index write failed ({e}) and the previous secret could not be restored ({restore})"
                    ),
                });
            }
            return Err(e.into());
        }
        drop(state);

        info!(credential_id = %id, provider = %provider.name, "credential updated");
        self.notify(StoreEvent::Updated(id));

        Ok(Credential {
            metadata,
            provider,
            secret,
        })
    }

    /// Record a validation result. Metadata only; the vault is not touched.
    ///
    /// Repeating a call with the same values changes nothing and does not
    /// rewrite the index. A negative result always clears the model list.
    pub async fn update_validation_result(
        &self,
        id: CredentialId,
        is_validated: bool,
        models: Vec<AvailableModel>,
    ) -> Result<(), StoreError> {
        let status = if is_validated {
            ValidationStatus::Valid {
                models: models.clone(),
            }
        } else {
            ValidationStatus::NotValidated
        };
        let mut state = self.state.lock().await;
        self.apply_validation(&mut state, id, is_validated, models, status)
            .await
    }

    /// Delete a credential's secret and metadata.
    ///
    /// If the vault delete fails the metadata is kept. If the index write
    /// fails after the secret is gone, the error is [`StoreError::Inconsistent`].
    pub async fn delete(&self, id: CredentialId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let index = state.position(id).ok_or(StoreError::NotFound(id))?;

        if let Err(e) = self.vault.delete(&id.account()).await {
            warn!(credential_id = %id, error = %e, "vault delete failed, credential kept");
            return Err(e.into());
        }

        state.entries.remove(index);

        if let Err(e) = self.persist(&mut state).await {
            warn!(credential_id = %id, error = %e, "secret deleted but index write failed");
            drop(state);
            self.notify(StoreEvent::Removed(id));
            return Err(StoreError::Inconsistent {
                id,
                reason: format!("secret deleted but metadata index write failed: {e}"),
            });
        }
        drop(state);

        info!(credential_id = %id, "credential deleted");
        self.notify(StoreEvent::Removed(id));
        Ok(())
    }

    /// All credentials in insertion order. Does not read the vault.
    pub async fn list(&self) -> Vec<CredentialSummary> {
        let state = self.state.lock().await;
        state.entries.iter().map(Entry::summary).collect()
    }

    /// Credentials whose name or provider contains `query`, ignoring case.
    ///
    /// An empty query matches everything.
    pub async fn search(&self, query: &str) -> Vec<CredentialSummary> {
        let needle = query.trim().to_lowercase();
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .filter(|e| {
                needle.is_empty()
                    || e.metadata.name.to_lowercase().contains(&needle)
                    || e.metadata.provider_name.to_lowercase().contains(&needle)
            })
            .map(Entry::summary)
            .collect()
    }

    /// Current validation status, including the in-memory `Validating` state.
    pub async fn status(&self, id: CredentialId) -> Option<ValidationStatus> {
        let state = self.state.lock().await;
        state.position(id).map(|i| state.entries[i].status.clone())
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// When the index was last written by this store instance.
    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.last_updated
    }

    /// Vault item identifier backing a credential.
    pub fn vault_item_id(&self, id: CredentialId) -> String {
        self.vault.item_id(&id.account())
    }

    /// Check every record against the vault.
    pub async fn verify_integrity(&self) -> Vec<IntegrityIssue> {
        let state = self.state.lock().await;
        let mut issues = Vec::new();
        for entry in &state.entries {
            let id = entry.metadata.id;
            match self.vault.get(&id.account()).await {
                Ok(_) => {}
                Err(VaultError::NotFound(_)) => {
                    warn!(credential_id = %id, "metadata has no secret in the vault");
                    issues.push(IntegrityIssue::MissingSecret(id));
                }
                Err(e) => issues.push(IntegrityIssue::VaultUnavailable {
                    id,
                    reason: e.to_string(),
                }),
            }
        }
        issues
    }

    /// Start a validation attempt: issue a ticket and fetch the credential.
    ///
    /// The status becomes `Validating` in memory only.
    pub async fn begin_validation(
        &self,
        id: CredentialId,
    ) -> Result<(ValidationTicket, Credential), StoreError> {
        let mut state = self.state.lock().await;
        let index = state.position(id).ok_or(StoreError::NotFound(id))?;

        let secret = self
            .vault
            .get(&id.account())
            .await
            .map_err(|e| self.vault_failure(id, e))?;

        let entry = &mut state.entries[index];
        entry.seq += 1;
        entry.status = ValidationStatus::Validating;
        let ticket = ValidationTicket { id, seq: entry.seq };
        let credential = Credential {
            metadata: entry.metadata.clone(),
            provider: entry.provider.clone(),
            secret,
        };
        drop(state);

        debug!(credential_id = %id, seq = ticket.seq, "validation started");
        self.notify(StoreEvent::StatusChanged {
            id,
            status: ValidationStatus::Validating,
        });
        Ok((ticket, credential))
    }

    /// Offer a finished attempt's outcome.
    ///
    /// Applied only if `ticket` is the newest attempt for its credential and
    /// the credential still exists. Returns whether it was applied.
    pub async fn complete_validation(
        &self,
        ticket: ValidationTicket,
        outcome: &ValidationOutcome,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.position(ticket.id) else {
            debug!(credential_id = %ticket.id, seq = ticket.seq, "discarding result for removed credential");
            return Ok(false);
        };
        let latest = state.entries[index].seq;
        if ticket.seq != latest {
            debug!(
                credential_id = %ticket.id,
                seq = ticket.seq,
                latest,
                "discarding superseded validation result"
            );
            return Ok(false);
        }

        let (is_validated, models, status) = match outcome {
            ValidationOutcome::Valid { models } => (
                true,
                models.clone(),
                ValidationStatus::Valid {
                    models: models.clone(),
                },
            ),
            ValidationOutcome::Invalid(err) => (
                false,
                Vec::new(),
                ValidationStatus::Invalid {
                    reason: err.to_string(),
                },
            ),
        };
        self.apply_validation(&mut state, ticket.id, is_validated, models, status)
            .await?;
        Ok(true)
    }

    async fn apply_validation(
        &self,
        state: &mut State,
        id: CredentialId,
        is_validated: bool,
        models: Vec<AvailableModel>,
        status: ValidationStatus,
    ) -> Result<(), StoreError> {
        let index = state.position(id).ok_or(StoreError::NotFound(id))?;
        let models = if is_validated { models } else { Vec::new() };

        let entry = &state.entries[index];
        let unchanged = entry.metadata.is_validated == is_validated
            && entry.metadata.available_models == models;
        let previous = entry.clone();

        let entry = &mut state.entries[index];
        entry.metadata.is_validated = is_validated;
        entry.metadata.available_models = models;
        entry.status = status.clone();

        if !unchanged && let Err(e) = self.persist(state).await {
            let entry = &mut state.entries[index];
            entry.metadata = previous.metadata.clone();
            entry.status = ValidationStatus::from_metadata(&previous.metadata);
            warn!(credential_id = %id, error = %e, "failed to persist validation result");
            return Err(e.into());
        }

        if previous.status != status {
            self.notify(StoreEvent::StatusChanged { id, status });
        }
        Ok(())
    }

    fn resolve(&self, provider_ref: Option<&ProviderId>, provider_name: &str) -> Provider {
        let resolution = self.registry.resolve_reference(provider_ref, provider_name);
        if let ProviderResolution::Custom(provider) = &resolution {
            debug!(provider = %provider.name, "credential uses a custom provider");
        }
        resolution.into_provider()
    }

    fn vault_failure(&self, id: CredentialId, err: VaultError) -> StoreError {
        let err = StoreError::from_vault(id, err);
        if err.is_corruption() {
            warn!(credential_id = %id, "metadata present but vault secret missing");
        }
        err
    }

    async fn persist(&self, state: &mut State) -> Result<(), crate::index::IndexError> {
        self.index.save(&state.records()).await?;
        state.last_updated = Some(Utc::now());
        Ok(())
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("vault", &self.vault)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
