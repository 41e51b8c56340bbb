//! On-disk locations used by aikeys.
//!
//! ```text
//! $XDG_CONFIG_HOME/aikeys/config.toml          layered config (user layer)
//! $XDG_DATA_HOME/aikeys/stored_api_keys.json   credential metadata index
//! ```
//!
//! The XDG variables fall back to `~/.config` and `~/.local/share` on every
//! platform. API key values are not written under either directory; only
//! names, providers and validation results are.

use std::path::PathBuf;

const APP_DIR: &str = "aikeys";

/// Directory holding `config.toml`.
///
/// `$XDG_CONFIG_HOME/aikeys`, else `~/.config/aikeys`.
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Directory holding the metadata index.
///
/// `$XDG_DATA_HOME/aikeys`, else `~/.local/share/aikeys`. It may not exist
/// yet; the index store creates it on first write.
///
/// # Examples
///
/// ```
/// let index = aikeys_paths::data_dir().join("stored_api_keys.json");
/// assert!(index.ends_with("aikeys/stored_api_keys.json"));
/// ```
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// The user-layer config file, `config_dir()/config.toml`.
///
/// # Examples
///
/// ```
/// let file = aikeys_paths::config_file();
/// assert_eq!(file.parent(), Some(aikeys_paths::config_dir().as_path()));
/// assert_eq!(file.extension().and_then(|e| e.to_str()), Some("toml"));
/// ```
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// `$var/aikeys` when set and non-empty, else `~/<home_fallback>/aikeys`.
fn xdg_dir(var: &str, home_fallback: &str) -> PathBuf {
    let root = match std::env::var_os(var) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => dirs::home_dir()
            .map(|home| home.join(home_fallback))
            .unwrap_or_else(|| PathBuf::from(home_fallback)),
    };
    root.join(APP_DIR)
}
