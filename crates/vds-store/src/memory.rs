use std::collections::HashMap;
use std::sync::RwLock;

use vds_types::Digest;

use crate::error::StoreResult;
use crate::traits::Backend;

/// In-memory, HashMap-based backend.
///
/// Intended for tests and embedding. Values are held behind a `RwLock` and
/// cloned on read.
pub struct MemoryBackend {
    entries: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Overwrite a value in place, bypassing any checks. Test helper for
    /// simulating on-disk corruption.
    #[cfg(test)]
    pub(crate) fn corrupt(&self, key: &Digest, data: Vec<u8>) {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(*key, data);
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn read(&self, key: &Digest) -> StoreResult<Option<Vec<u8>>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn write(&self, key: &Digest, data: &[u8]) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        map.insert(*key, data.to_vec());
        Ok(())
    }

    fn delete(&self, key: &Digest) -> StoreResult<bool> {
        let mut map = self.entries.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }

    fn size_of(&self, key: &Digest) -> StoreResult<Option<u64>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(key).map(|data| data.len() as u64))
    }

    fn list(&self) -> StoreResult<Vec<Digest>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.keys().copied().collect())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("entry_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> Digest {
        Digest::from_hash([byte; 32])
    }

    #[test]
    fn write_read_delete() {
        let backend = MemoryBackend::new();
        backend.write(&key(1), b"abc").unwrap();
        assert_eq!(backend.read(&key(1)).unwrap(), Some(b"abc".to_vec()));
        assert_eq!(backend.size_of(&key(1)).unwrap(), Some(3));
        assert!(backend.contains(&key(1)).unwrap());

        assert!(backend.delete(&key(1)).unwrap());
        assert!(!backend.delete(&key(1)).unwrap());
        assert!(backend.read(&key(1)).unwrap().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn write_replaces_value() {
        let backend = MemoryBackend::new();
        backend.write(&key(2), b"old").unwrap();
        backend.write(&key(2), b"newer").unwrap();
        assert_eq!(backend.size_of(&key(2)).unwrap(), Some(5));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn list_returns_all_keys() {
        let backend = MemoryBackend::default();
        for byte in 1..=3 {
            backend.write(&key(byte), &[byte]).unwrap();
        }
        let mut keys = backend.list().unwrap();
        keys.sort();
        assert_eq!(keys, vec![key(1), key(2), key(3)]);
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let backend = Arc::new(MemoryBackend::new());
        backend.write(&key(9), b"shared").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let backend = Arc::clone(&backend);
                thread::spawn(move || {
                    assert_eq!(backend.read(&key(9)).unwrap(), Some(b"shared".to_vec()));
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let backend = MemoryBackend::new();
        backend.write(&key(1), b"x").unwrap();
        let debug = format!("{backend:?}");
        assert!(debug.contains("MemoryBackend"));
        assert!(debug.contains("entry_count"));
    }
}
