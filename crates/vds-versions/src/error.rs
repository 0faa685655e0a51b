//! Error types for version history operations.

use vds_types::VersionName;

/// Errors that can occur while editing or querying a version history.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// A referenced version is not in the history.
    #[error("version not found: {0:?}")]
    NotFound(VersionName),

    /// The new version is already present somewhere in the history.
    #[error("version already exists: {0:?}")]
    AlreadyExists(VersionName),

    /// A root was requested but the history already has one.
    #[error("history already has a root")]
    RootExists,

    /// A child must carry a strictly greater index than its parent.
    #[error("invalid version {child:?}: index must exceed parent {parent:?}")]
    InvalidVersion {
        parent: VersionName,
        child: VersionName,
    },

    /// The version exists but has children.
    #[error("not a tip: {0:?}")]
    NotATip(VersionName),

    /// Adding the version would exceed the bound and nothing can be pruned.
    #[error("history full: cannot keep more than {max} versions")]
    HistoryFull { max: usize },

    /// The arena's links are inconsistent.
    #[error("corrupt history: {0}")]
    Corrupt(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for version history results.
pub type VersionResult<T> = Result<T, VersionError>;
