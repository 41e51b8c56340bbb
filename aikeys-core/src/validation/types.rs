//! Validation outcome and error taxonomy.

use serde::Deserialize;
use thiserror::Error;

use crate::store::AvailableModel;

/// Why a validation attempt did not confirm the key.
///
/// Closed set: every failure path of a validation attempt maps to exactly
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The provider base URL cannot form a request URL.
    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),

    /// The request could not be completed (connect, TLS, timeout).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The response could not be read as an HTTP response body.
    #[error("invalid response")]
    InvalidResponse,

    /// HTTP 401: the provider rejected the key.
    #[error("unauthorized: the provider rejected the API key")]
    Unauthorized,

    /// Any other non-success HTTP status.
    #[error("server error: HTTP {0}")]
    ServerError(u16),

    /// A body was returned but is not a model listing.
    #[error("failed to decode model listing: {0}")]
    DecodingError(String),

    /// The provider has no base URL, so nothing can be called.
    #[error("provider base URL empty")]
    MissingEndpoint,

    /// The attempt ended without a classifiable result.
    #[error("unknown validation error")]
    Unknown,
}

/// Terminal result of one validation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The key was accepted; `models` may be empty.
    Valid { models: Vec<AvailableModel> },
    /// The key could not be confirmed.
    Invalid(ValidationError),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Models reported by a successful attempt; empty otherwise.
    pub fn models(&self) -> &[AvailableModel] {
        match self {
            Self::Valid { models } => models,
            Self::Invalid(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ValidationOutcome {
    fn from(err: ValidationError) -> Self {
        Self::Invalid(err)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Model listing wire format
// ────────────────────────────────────────────────────────────────────────────

/// Response from the OpenAI-compatible `GET /models` endpoint.
#[derive(Debug, Deserialize)]
pub struct ModelListResponse {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

/// One entry of a model listing.
#[derive(Debug, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub owned_by: Option<String>,
}

impl ModelEntry {
    pub fn to_available_model(&self) -> AvailableModel {
        AvailableModel::new(&self.id, self.owned_by.clone().unwrap_or_default())
    }
}
