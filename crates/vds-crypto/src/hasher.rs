use vds_types::{DataKey, Digest};

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"vds-block-v1"`) that is
/// prepended to every hash computation, so a block and a version payload with
/// identical bytes never share a digest.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for immutable block names.
    pub const BLOCK: Self = Self {
        domain: "vds-block-v1",
    };
    /// Hasher for version payload ids.
    pub const VERSION: Self = Self {
        domain: "vds-version-v1",
    };
    /// Hasher for history storage keys.
    pub const HISTORY: Self = Self {
        domain: "vds-history-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash a data key: the kind tag followed by the name bytes.
    ///
    /// Used to place a version history in storage, so that equal names under
    /// different kinds land on different keys.
    pub fn hash_key(&self, key: &DataKey) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(&[key.kind.tag()]);
        hasher.update(key.name.as_bytes());
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
