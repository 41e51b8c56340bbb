//! Validation orchestration.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{CredentialVerifier, ValidationError, ValidationOutcome};
use crate::store::{Credential, CredentialId, CredentialStore, StoreError};

/// Runs validation attempts and reports them back to the store.
#[derive(Clone)]
pub struct ValidationEngine {
    verifier: Arc<dyn CredentialVerifier>,
}

impl ValidationEngine {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    /// Check one credential.
    ///
    /// A provider without a base URL yields [`ValidationError::MissingEndpoint`]
    /// without any network call; otherwise the verifier is called exactly once.
    pub async fn validate(&self, credential: &Credential) -> ValidationOutcome {
        let provider = &credential.provider;
        if !provider.is_validatable() {
            warn!(
                credential_id = %credential.id(),
                provider = %provider.name,
                custom = provider.is_custom(),
                "provider has no base URL, skipping validation call"
            );
            return ValidationOutcome::Invalid(ValidationError::MissingEndpoint);
        }

        info!(
            credential_id = %credential.id(),
            provider = %provider.name,
            "validating credential"
        );
        let outcome = self.verifier.verify(provider, credential.secret()).await;

        match &outcome {
            ValidationOutcome::Valid { models } => info!(
                credential_id = %credential.id(),
                models = models.len(),
                "credential is valid"
            ),
            ValidationOutcome::Invalid(err) => warn!(
                credential_id = %credential.id(),
                error = %err,
                "credential validation failed"
            ),
        }
        outcome
    }

    /// Start a background validation for `id`.
    ///
    /// The credential is marked `Validating` and tagged with a new sequence
    /// number. The returned handle resolves once the result has been offered
    /// to the store; it is applied only if no newer attempt was started.
    pub async fn start(
        &self,
        store: Arc<CredentialStore>,
        id: CredentialId,
    ) -> Result<ValidationHandle, StoreError> {
        let (ticket, credential) = store.begin_validation(id).await?;
        let seq = ticket.seq();
        let engine = self.clone();

        let task = tokio::spawn(async move {
            let check = tokio::spawn(async move { engine.validate(&credential).await });
            let outcome = match check.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(credential_id = %id, error = %e, "validation task did not finish");
                    ValidationOutcome::Invalid(ValidationError::Unknown)
                }
            };

            let (applied, error) = match store.complete_validation(ticket, &outcome).await {
                Ok(applied) => (applied, None),
                Err(e) => {
                    warn!(credential_id = %id, error = %e, "failed to record validation result");
                    (false, Some(e))
                }
            };

            ValidationReport {
                id,
                seq,
                outcome,
                applied,
                error,
            }
        });

        Ok(ValidationHandle { id, seq, task })
    }

    /// Start a validation and wait for its report.
    pub async fn run(
        &self,
        store: Arc<CredentialStore>,
        id: CredentialId,
    ) -> Result<ValidationReport, StoreError> {
        Ok(self.start(store, id).await?.join().await)
    }
}

/// Handle to an in-flight validation attempt.
#[derive(Debug)]
pub struct ValidationHandle {
    id: CredentialId,
    seq: u64,
    task: JoinHandle<ValidationReport>,
}

impl ValidationHandle {
    pub fn id(&self) -> CredentialId {
        self.id
    }

    /// Sequence number of this attempt.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wait for the attempt to finish.
    pub async fn join(self) -> ValidationReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                warn!(credential_id = %self.id, error = %e, "validation task aborted");
                ValidationReport {
                    id: self.id,
                    seq: self.seq,
                    outcome: ValidationOutcome::Invalid(ValidationError::Unknown),
                    applied: false,
                    error: None,
                }
            }
        }
    }
}

/// What happened to one validation attempt.
#[derive(Debug)]
pub struct ValidationReport {
    pub id: CredentialId,
    pub seq: u64,
    pub outcome: ValidationOutcome,
    /// Whether the outcome was written to the store (false when superseded).
    pub applied: bool,
    /// Set when the outcome was current but could not be persisted.
    pub error: Option<StoreError>,
}
