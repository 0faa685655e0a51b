use vds_types::Digest;

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested block was not found.
    #[error("block not found: {0}")]
    NotFound(Digest),

    /// Bytes do not hash to the claimed name (corruption or forgery).
    #[error("hash mismatch for {name}: computed {computed}")]
    HashMismatch { name: Digest, computed: Digest },

    /// Storing the block would push usage past the configured maximum.
    #[error("disk usage exceeded: {requested} more bytes on top of {usage} exceeds limit {max}")]
    DiskUsageExceeded { requested: u64, usage: u64, max: u64 },

    /// Attempted to store a block under the null name.
    #[error("cannot store block with null name")]
    NullName,

    /// The storage root is missing, unwritable or inconsistent.
    #[error("initialisation failed: {0}")]
    Init(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
