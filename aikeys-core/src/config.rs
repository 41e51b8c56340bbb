//! Layered TOML configuration.
//!
//! Layers, lowest first: built-in defaults, the user file
//! (`config_dir()/config.toml`, or `$AIKEYS_CONFIG_DIR/config.toml`), then
//! an explicit path. Later layers only override values they set.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::providers::Provider;
use crate::validation::DEFAULT_TIMEOUT;
use crate::vault::DEFAULT_SERVICE;

/// Environment variable that replaces the user config directory.
pub const CONFIG_DIR_ENV: &str = "AIKEYS_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

// ────────────────────────────────────────────────────────────────────────────
// Raw (file) form
// ────────────────────────────────────────────────────────────────────────────

/// Configuration as stored in TOML files (optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawAikeysConfig {
    #[serde(default)]
    pub storage: RawStorageConfig,

    #[serde(default)]
    pub vault: RawVaultConfig,

    #[serde(default)]
    pub validation: RawValidationConfig,

    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStorageConfig {
    /// Directory holding the metadata index
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawVaultConfig {
    /// Keyring service name
    pub service: Option<String>,

    pub backend: Option<VaultBackend>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawValidationConfig {
    /// Request timeout for one validation call
    pub timeout_secs: Option<u64>,
}

/// A `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_model: String,
}

impl ProviderEntry {
    pub fn to_provider(&self) -> Provider {
        Provider::new(
            self.name.trim(),
            &self.homepage,
            &self.base_url,
            &self.description,
            &self.default_model,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Final form
// ────────────────────────────────────────────────────────────────────────────

/// Which vault implementation holds secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultBackend {
    /// The OS keyring.
    #[default]
    Keyring,
    /// Process memory; secrets are lost on exit.
    Memory,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AikeysConfig {
    pub storage: StorageConfig,
    pub vault: VaultConfig,
    pub validation: ValidationConfig,
    pub providers: Vec<ProviderEntry>,
}

impl AikeysConfig {
    /// Provider overrides and additions, in file order.
    pub fn provider_entries(&self) -> Vec<Provider> {
        self.providers.iter().map(ProviderEntry::to_provider).collect()
    }
}

impl Default for AikeysConfig {
    fn default() -> Self {
        ConfigLoader::finalize(RawAikeysConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub service: String,
    pub backend: VaultBackend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    pub timeout_secs: u64,
}

impl ValidationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loader
// ────────────────────────────────────────────────────────────────────────────

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults merged with the user config file, if present.
    pub fn load() -> Result<AikeysConfig, ConfigError> {
        Self::load_with(None)
    }

    /// Load defaults, the user config file, then `explicit` on top.
    ///
    /// A missing user file is skipped; a missing explicit file is an error.
    pub fn load_with(explicit: Option<&Path>) -> Result<AikeysConfig, ConfigError> {
        let mut raw = RawAikeysConfig::default();

        // Layer 1: user config
        let user_path = Self::user_config_path();
        if user_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: explicit file
        if let Some(path) = explicit {
            raw = Self::merge_raw(raw, Self::read_raw(path)?);
        }

        Self::validate(Self::finalize(raw))
    }

    /// Parse a single TOML document over the defaults.
    pub fn parse(contents: &str) -> Result<AikeysConfig, ConfigError> {
        let raw: RawAikeysConfig = toml::from_str(contents)?;
        Self::validate(Self::finalize(raw))
    }

    /// User config path.
    /// Can be overridden with AIKEYS_CONFIG_DIR (useful for isolated tests)
    pub fn user_config_path() -> PathBuf {
        match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join(CONFIG_FILE),
            _ => aikeys_paths::config_file(),
        }
    }

    fn read_raw(path: &Path) -> Result<RawAikeysConfig, ConfigError> {
        debug!(path = %path.display(), "reading config layer");
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Merge two raw configs (overlay values override base only if set).
    ///
    /// Provider entries accumulate; a later entry with the same name wins
    /// when the registry applies them.
    fn merge_raw(base: RawAikeysConfig, overlay: RawAikeysConfig) -> RawAikeysConfig {
        let mut providers = base.providers;
        providers.extend(overlay.providers);

        RawAikeysConfig {
            storage: RawStorageConfig {
                data_dir: overlay.storage.data_dir.or(base.storage.data_dir),
            },
            vault: RawVaultConfig {
                service: overlay.vault.service.or(base.vault.service),
                backend: overlay.vault.backend.or(base.vault.backend),
            },
            validation: RawValidationConfig {
                timeout_secs: overlay
                    .validation
                    .timeout_secs
                    .or(base.validation.timeout_secs),
            },
            providers,
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawAikeysConfig) -> AikeysConfig {
        AikeysConfig {
            storage: StorageConfig {
                data_dir: raw.storage.data_dir.unwrap_or_else(aikeys_paths::data_dir),
            },
            vault: VaultConfig {
                service: raw
                    .vault
                    .service
                    .unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
                backend: raw.vault.backend.unwrap_or_default(),
            },
            validation: ValidationConfig {
                timeout_secs: raw
                    .validation
                    .timeout_secs
                    .unwrap_or(DEFAULT_TIMEOUT.as_secs()),
            },
            providers: raw.providers,
        }
    }

    fn validate(config: AikeysConfig) -> Result<AikeysConfig, ConfigError> {
        if config.vault.service.trim().is_empty() {
            return Err(ConfigError::Invalid("vault.service must not be empty".into()));
        }
        if config.validation.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "validation.timeout_secs must be greater than zero".into(),
            ));
        }
        if let Some(entry) = config.providers.iter().find(|p| p.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "provider entry with base_url {:?} has no name",
                entry.base_url
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ConfigLoader::parse("").unwrap();
        assert_eq!(config.vault.service, "AIKeys");
        assert_eq!(config.vault.backend, VaultBackend::Keyring);
        assert_eq!(config.validation.timeout(), Duration::from_secs(60));
        assert_eq!(config.storage.data_dir, aikeys_paths::data_dir());
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_parse_all_sections() {
        let config = ConfigLoader::parse(
            r#"
            [storage]
            data_dir = "/tmp/aikeys-data"

            [vault]
            service = "AIKeys-dev"
            backend = "memory"

            [validation]
            timeout_secs = 15

            [[providers]]
            name = "Local LLM"
            base_url = "http://localhost:8080/v1"
            default_model = "llama3"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/aikeys-data"));
        assert_eq!(config.vault.service, "AIKeys-dev");
        assert_eq!(config.vault.backend, VaultBackend::Memory);
        assert_eq!(config.validation.timeout_secs, 15);

        let providers = config.provider_entries();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].id.as_str(), "local-llm");
        assert_eq!(providers[0].default_model, "llama3");
        assert!(providers[0].homepage.is_empty());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ConfigLoader::parse("[validation]\ntimeout_secs = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ConfigLoader::parse("[vault]\nservice = \"  \""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ConfigLoader::parse("[[providers]]\nname = \"\"\nbase_url = \"http://x\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ConfigLoader::parse("[vault]\nbackend = \"floppy\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_merge_overlay_wins_only_when_set() {
        let base: RawAikeysConfig = toml::from_str(
            r#"
            [vault]
            service = "base"
            backend = "memory"

            [[providers]]
            name = "A"
            "#,
        )
        .unwrap();
        let overlay: RawAikeysConfig = toml::from_str(
            r#"
            [vault]
            service = "overlay"

            [validation]
            timeout_secs = 5

            [[providers]]
            name = "B"
            "#,
        )
        .unwrap();

        let config = ConfigLoader::finalize(ConfigLoader::merge_raw(base, overlay));
        assert_eq!(config.vault.service, "overlay");
        assert_eq!(config.vault.backend, VaultBackend::Memory);
        assert_eq!(config.validation.timeout_secs, 5);
        let names: Vec<_> = config.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_load_layers_user_then_explicit() {
        let user_dir = TempDir::new().unwrap();
        std::fs::write(
            user_dir.path().join("config.toml"),
            "[vault]\nservice = \"user\"\n[validation]\ntimeout_secs = 30\n",
        )
        .unwrap();

        let explicit_dir = TempDir::new().unwrap();
        let explicit = explicit_dir.path().join("override.toml");
        std::fs::write(&explicit, "[validation]\ntimeout_secs = 10\n").unwrap();

        // SAFETY: only this test reads AIKEYS_CONFIG_DIR
        unsafe {
            std::env::set_var(CONFIG_DIR_ENV, user_dir.path());
        }
        let result = ConfigLoader::load_with(Some(&explicit));
        let missing = ConfigLoader::load_with(Some(&explicit_dir.path().join("absent.toml")));
        unsafe {
            std::env::remove_var(CONFIG_DIR_ENV);
        }

        let config = result.unwrap();
        assert_eq!(config.vault.service, "user");
        assert_eq!(config.validation.timeout_secs, 10);
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
