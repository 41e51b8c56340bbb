//! Error types for the credential store.

use thiserror::Error;

use crate::index::IndexError;
use crate::store::StoreError;
use crate::validation::ValidationError;
use crate::vault::VaultError;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for aikeys-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Vault access failed outside a store operation.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// Metadata index could not be read or written.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Validation client could not be constructed or used.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_wraps_store_error() {
        let id = crate::CredentialId::new();
        let err: Error = StoreError::NotFound(id).into();
        assert_eq!(err.to_string(), format!("store error: credential not found: {id}"));
    }

    #[test]
    fn error_from_toml_parse() {
        let toml_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err: Error = ConfigError::from(toml_err).into();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
