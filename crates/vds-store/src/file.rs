//! File-based storage backend.
//!
//! Stores one file per key with a two-level fan-out directory structure:
//! `{root}/{hex[0..2]}/{hex[2..4]}/{hex}`.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vds_types::Digest;

use crate::error::{StoreError, StoreResult};
use crate::traits::Backend;

const TMP_EXTENSION: &str = "tmp";
const PROBE_FILE: &str = ".probe";

/// Flush strategy for file writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` every file before it is renamed into place.
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::OsDefault
    }
}

/// File-based backend with a two-level fan-out directory layout.
///
/// Writes are atomic: data goes to `{hex}.tmp` next to its final path and is
/// then renamed into place, so a crash never leaves a half-written value
/// under a real key. Leftover temporary files are swept on open.
pub struct FileBackend {
    root: PathBuf,
    sync_mode: SyncMode,
}

impl FileBackend {
    /// Open (or create) a backend rooted at `root`.
    ///
    /// Fails with [`StoreError::Init`] if the root cannot be created, is not
    /// a directory, or is not writable.
    pub fn open(root: impl AsRef<Path>, sync_mode: SyncMode) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            StoreError::Init(format!("cannot create {}: {e}", root.display()))
        })?;
        if !root.is_dir() {
            return Err(StoreError::Init(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let probe = root.join(PROBE_FILE);
        fs::write(&probe, b"probe")
            .and_then(|()| fs::remove_file(&probe))
            .map_err(|e| StoreError::Init(format!("{} is not writable: {e}", root.display())))?;

        let backend = Self { root, sync_mode };
        let swept = backend.sweep_temp_files()?;
        info!(root = %backend.root.display(), swept, "file backend opened");
        Ok(backend)
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full file path for a key.
    fn key_path(&self, key: &Digest) -> PathBuf {
        let hex = key.to_hex();
        self.root.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }

    /// Visit every file two levels below the root.
    fn for_each_file(&self, mut visit: impl FnMut(&Path) -> StoreResult<()>) -> StoreResult<()> {
        for d0 in fs::read_dir(&self.root)? {
            let d0 = d0?;
            if !d0.file_type()?.is_dir() {
                continue;
            }
            for d1 in fs::read_dir(d0.path())? {
                let d1 = d1?;
                if !d1.file_type()?.is_dir() {
                    continue;
                }
                for entry in fs::read_dir(d1.path())? {
                    let entry = entry?;
                    if entry.file_type()?.is_file() {
                        visit(&entry.path())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove temporary files left behind by interrupted writes.
    fn sweep_temp_files(&self) -> StoreResult<usize> {
        let mut swept = 0;
        self.for_each_file(|path| {
            if path.extension().is_some_and(|ext| ext == TMP_EXTENSION) {
                warn!(path = %path.display(), "removing interrupted write");
                fs::remove_file(path)?;
                swept += 1;
            }
            Ok(())
        })?;
        Ok(swept)
    }
}

impl Backend for FileBackend {
    fn read(&self, key: &Digest) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.key_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &Digest, data: &[u8]) -> StoreResult<()> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension(TMP_EXTENSION);
        let mut file = File::create(&tmp_path)?;
        file.write_all(data)?;
        if matches!(self.sync_mode, SyncMode::EveryWrite) {
            file.sync_all()?;
        }
        drop(file);
        fs::rename(&tmp_path, &path)?;

        debug!(key = %key.short_hex(), size = data.len(), "wrote file");
        Ok(())
    }

    fn delete(&self, key: &Digest) -> StoreResult<bool> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn size_of(&self, key: &Digest) -> StoreResult<Option<u64>> {
        match fs::metadata(self.key_path(key)) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StoreResult<Vec<Digest>> {
        let mut keys = Vec::new();
        self.for_each_file(|path| {
            if let Some(key) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| Digest::from_hex(name).ok())
            {
                keys.push(key);
            }
            Ok(())
        })?;
        Ok(keys)
    }
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackend")
            .field("root", &self.root)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}
