//! File-backed settings store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::{IndexError, SettingsStore};

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling that is synced and then renamed over
/// the target, so a crash leaves either the old or the new file.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");

        let written = match write_synced(&temp_path, value).await {
            Ok(()) => fs::rename(&temp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = ?temp_path, error = %cleanup, "failed to remove temporary settings file");
            }
            return Err(e.into());
        }

        #[cfg(unix)]
        fs::File::open(&self.dir).await?.sync_all().await?;

        debug!(path = ?path, bytes = value.len(), "settings written");
        Ok(())
    }
}

/// Write `value` to a fresh owner-only file and flush it to disk.
async fn write_synced(path: &Path, value: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(value).await?;
    file.sync_all().await?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        if let Err(e) = fs::set_permissions(path, perms).await {
            warn!(path = ?path, error = %e, "failed to set settings file permissions to 0600");
        }
    }
    Ok(())
}
