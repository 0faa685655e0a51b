use tracing::{debug, error, info, warn};
use vds_crypto::ContentHasher;
use vds_types::{Digest, DiskUsage};

use crate::block::ImmutableBlock;
use crate::error::{StoreError, StoreResult};
use crate::traits::Backend;
use crate::usage::DiskUsageTracker;

/// What a successful [`BlockStore::put`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// The block was written and its size added to usage.
    Stored,
    /// An identical block was already present; nothing changed.
    AlreadyPresent,
}

/// Content-addressed block store bounded by a disk-usage ceiling.
///
/// The store does not serialize callers. Two concurrent puts of the same
/// new block may both be charged, so callers must route every operation on
/// a given name through a single writer (the engine does this by worker
/// affinity).
pub struct BlockStore {
    backend: Box<dyn Backend>,
    usage: DiskUsageTracker,
}

impl BlockStore {
    /// Open a store over `backend`, rebuilding usage from what is already
    /// stored.
    ///
    /// Fails with [`StoreError::Init`] if the recovered usage is already
    /// above `max_usage`.
    pub fn open(backend: Box<dyn Backend>, max_usage: u64) -> StoreResult<Self> {
        let mut recovered = 0u64;
        let mut blocks = 0usize;
        for name in backend.list()? {
            if let Some(size) = backend.size_of(&name)? {
                recovered = recovered.saturating_add(size);
                blocks += 1;
            }
        }

        if recovered > max_usage {
            return Err(StoreError::Init(format!(
                "recovered usage {recovered} exceeds limit {max_usage}"
            )));
        }

        info!(blocks, usage = recovered, max = max_usage, "block store opened");
        Ok(Self {
            backend,
            usage: DiskUsageTracker::with_usage(max_usage, recovered),
        })
    }

    /// Store a block.
    ///
    /// Putting a block that is already present is a no-op. The usage check
    /// and the counter update happen before the write; a failed write gives
    /// the reservation back.
    pub fn put(&self, block: &ImmutableBlock) -> StoreResult<PutOutcome> {
        if block.name.is_null() {
            return Err(StoreError::NullName);
        }
        block.verify()?;

        if let Some(existing) = self.backend.read(&block.name)? {
            if existing == block.data {
                debug!(name = %block.name.short_hex(), "block already present");
                return Ok(PutOutcome::AlreadyPresent);
            }
            let computed = ContentHasher::BLOCK.hash(&existing);
            error!(name = %block.name, %computed, "stored block is corrupt");
            return Err(StoreError::HashMismatch {
                name: block.name,
                computed,
            });
        }

        let size = block.size();
        let usage = self.usage.try_reserve(size).map_err(|e| {
            warn!(name = %block.name.short_hex(), size, "put rejected: {e}");
            e
        })?;

        if let Err(e) = self.backend.write(&block.name, &block.data) {
            self.usage.release(size);
            return Err(e);
        }

        debug!(name = %block.name.short_hex(), size, %usage, "stored block");
        Ok(PutOutcome::Stored)
    }

    /// Fetch a block, re-hashing the stored bytes before returning them.
    pub fn get(&self, name: &Digest) -> StoreResult<ImmutableBlock> {
        let data = self
            .backend
            .read(name)?
            .ok_or(StoreError::NotFound(*name))?;

        let block = ImmutableBlock::from_parts(*name, data);
        if let Err(e) = block.verify() {
            error!(name = %name, "stored block failed verification");
            return Err(e);
        }
        Ok(block)
    }

    /// Remove a block. Returns the number of bytes freed, or `None` if the
    /// block was absent.
    pub fn delete(&self, name: &Digest) -> StoreResult<Option<u64>> {
        let Some(size) = self.backend.size_of(name)? else {
            debug!(name = %name.short_hex(), "delete of absent block");
            return Ok(None);
        };
        if !self.backend.delete(name)? {
            return Ok(None);
        }

        let usage = self.usage.release(size);
        debug!(name = %name.short_hex(), size, %usage, "deleted block");
        Ok(Some(size))
    }

    /// Check whether a block is stored.
    pub fn contains(&self, name: &Digest) -> StoreResult<bool> {
        self.backend.contains(name)
    }

    /// Current aggregate size of stored blocks.
    pub fn usage(&self) -> DiskUsage {
        self.usage.current()
    }

    /// Configured ceiling.
    pub fn max_usage(&self) -> DiskUsage {
        self.usage.max()
    }
}

impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockStore")
            .field("backend", &"<dyn Backend>")
            .field("usage", &self.usage.current())
            .field("max", &self.usage.max())
            .finish()
    }
}
