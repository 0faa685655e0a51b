use std::fmt;

use thiserror::Error;
use vds_store::StoreError;
use vds_types::{DataKey, DataKind};
use vds_versions::VersionError;

#[derive(Debug, Error)]
pub enum DataStoreError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("version error: {0}")]
    Version(#[from] VersionError),

    #[error("{operation} is not permitted on {kind} data")]
    EditNotPermitted {
        kind: DataKind,
        operation: &'static str,
    },

    #[error("permission denied on {key}: {reason}")]
    PermissionDenied { key: DataKey, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data store is shut down")]
    Shutdown,
}

pub type DataStoreResult<T> = Result<T, DataStoreError>;

/// Coarse classification of every [`DataStoreError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    DiskUsageExceeded,
    HashMismatch,
    Init,
    InvalidRequest,
    PermissionDenied,
    Io,
    Shutdown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::DiskUsageExceeded => "disk usage exceeded",
            Self::HashMismatch => "hash mismatch",
            Self::Init => "initialisation failed",
            Self::InvalidRequest => "invalid request",
            Self::PermissionDenied => "permission denied",
            Self::Io => "I/O error",
            Self::Shutdown => "shut down",
        };
        f.write_str(name)
    }
}

impl DataStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => match e {
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::HashMismatch { .. } => ErrorKind::HashMismatch,
                StoreError::DiskUsageExceeded { .. } => ErrorKind::DiskUsageExceeded,
                StoreError::NullName => ErrorKind::InvalidRequest,
                StoreError::Init(_) => ErrorKind::Init,
                StoreError::Io(_) => ErrorKind::Io,
            },
            Self::Version(e) => match e {
                VersionError::NotFound(_) => ErrorKind::NotFound,
                VersionError::AlreadyExists(_) | VersionError::RootExists => {
                    ErrorKind::AlreadyExists
                }
                VersionError::InvalidVersion { .. }
                | VersionError::NotATip(_)
                | VersionError::HistoryFull { .. } => ErrorKind::InvalidRequest,
                VersionError::Corrupt(_) | VersionError::Serialization(_) => ErrorKind::Io,
            },
            Self::EditNotPermitted { .. } | Self::PermissionDenied { .. } => {
                ErrorKind::PermissionDenied
            }
            Self::Config(_) => ErrorKind::Init,
            Self::Io(_) => ErrorKind::Io,
            Self::Shutdown => ErrorKind::Shutdown,
        }
    }
}
