use vds_crypto::ContentHasher;
use vds_types::Digest;

use crate::error::{StoreError, StoreResult};

/// An immutable, content-addressed block.
///
/// `name` is the claimed digest of `data`. Blocks built with [`new`] are
/// correct by construction; blocks received from elsewhere are built with
/// [`from_parts`] and checked with [`verify`] before they are stored.
///
/// [`new`]: ImmutableBlock::new
/// [`from_parts`]: ImmutableBlock::from_parts
/// [`verify`]: ImmutableBlock::verify
#[derive(Clone, PartialEq, Eq)]
pub struct ImmutableBlock {
    pub name: Digest,
    pub data: Vec<u8>,
}

impl ImmutableBlock {
    /// Create a block, naming it by the hash of its bytes.
    pub fn new(data: Vec<u8>) -> Self {
        let name = ContentHasher::BLOCK.hash(&data);
        Self { name, data }
    }

    /// Pair bytes with a claimed name without checking it.
    pub fn from_parts(name: Digest, data: Vec<u8>) -> Self {
        Self { name, data }
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Recompute the name from the payload.
    pub fn computed_name(&self) -> Digest {
        ContentHasher::BLOCK.hash(&self.data)
    }

    /// Check that the payload hashes to the claimed name.
    pub fn verify(&self) -> StoreResult<()> {
        let computed = self.computed_name();
        if computed != self.name {
            return Err(StoreError::HashMismatch {
                name: self.name,
                computed,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ImmutableBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmutableBlock")
            .field("name", &self.name)
            .field("size", &self.data.len())
            .finish()
    }
}
