use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vds_store::SyncMode;

use crate::error::{DataStoreError, DataStoreResult};

/// Construction-time settings for a [`DataStore`](crate::DataStore).
///
/// Missing TOML fields fall back to [`Default`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding `blocks/` and `versions/`.
    pub root: PathBuf,
    /// Ceiling on the aggregate size of stored blocks, in bytes.
    pub max_disk_usage: u64,
    /// Versions retained per history before old roots are pruned.
    pub max_versions: usize,
    /// Worker threads; requests are spread across them by key.
    pub workers: usize,
    pub sync: SyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("vds-data"),
            max_disk_usage: 1024 * 1024 * 1024,
            max_versions: 100,
            workers: 4,
            sync: SyncMode::default(),
        }
    }
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>, max_disk_usage: u64) -> Self {
        Self {
            root: root.into(),
            max_disk_usage,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> DataStoreResult<Self> {
        toml::from_str(text).map_err(|e| DataStoreError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> DataStoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DataStoreError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> DataStoreResult<String> {
        toml::to_string(self).map_err(|e| DataStoreError::Config(e.to_string()))
    }

    /// Reject settings no store can run with.
    pub fn validate(&self) -> DataStoreResult<()> {
        if self.max_disk_usage == 0 {
            return Err(DataStoreError::Config("max_disk_usage must be positive".into()));
        }
        if self.max_versions == 0 {
            return Err(DataStoreError::Config("max_versions must be positive".into()));
        }
        if self.workers == 0 {
            return Err(DataStoreError::Config("workers must be positive".into()));
        }
        Ok(())
    }
}
