//! Validation engine.
//!
//! A validation attempt makes exactly one outbound call with the stored
//! secret and classifies the result into [`ValidationError`]'s closed set.
//! Attempts run on background tasks; results go back through the
//! credential store, which discards completions that were superseded by a
//! newer attempt for the same credential.

mod engine;
mod http;
mod types;

use async_trait::async_trait;

use crate::providers::Provider;
use crate::ApiKey;

pub use engine::{ValidationEngine, ValidationHandle, ValidationReport};
pub use http::{DEFAULT_TIMEOUT, HttpVerifier};
pub use types::{ModelEntry, ModelListResponse, ValidationError, ValidationOutcome};

/// Performs the live check of a secret against a provider.
///
/// Implementations report every failure as a [`ValidationOutcome::Invalid`]
/// value rather than an error, so each call yields exactly one outcome.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, provider: &Provider, secret: &ApiKey) -> ValidationOutcome;
}
