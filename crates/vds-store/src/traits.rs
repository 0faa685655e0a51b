use vds_types::Digest;

use crate::error::StoreResult;

/// Durable byte storage keyed by digest.
///
/// The backend is a pure key-value store: it never interprets or verifies
/// the bytes it holds, and it knows nothing about usage limits. Accounting
/// and hash checks live in [`BlockStore`](crate::BlockStore).
///
/// Implementations must satisfy:
/// - `write` replaces any previous value atomically; readers observe either
///   the old or the new bytes, never a torn mix.
/// - All I/O errors are propagated, never silently ignored.
pub trait Backend: Send + Sync {
    /// Read the bytes stored under `key`. Returns `Ok(None)` if absent.
    fn read(&self, key: &Digest) -> StoreResult<Option<Vec<u8>>>;

    /// Store `data` under `key`, replacing any previous value.
    fn write(&self, key: &Digest, data: &[u8]) -> StoreResult<()>;

    /// Remove `key`. Returns `true` if it existed.
    fn delete(&self, key: &Digest) -> StoreResult<bool>;

    /// Size in bytes of the value under `key`, if present.
    fn size_of(&self, key: &Digest) -> StoreResult<Option<u64>>;

    /// All keys currently stored, in no particular order.
    fn list(&self) -> StoreResult<Vec<Digest>>;

    /// Check whether `key` is present.
    fn contains(&self, key: &Digest) -> StoreResult<bool> {
        Ok(self.size_of(key)?.is_some())
    }
}
