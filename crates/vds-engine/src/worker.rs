//! Worker threads that own all mutation of blocks and histories.
//!
//! Each worker drains its own queue in order. A key always maps to the same
//! worker, so that worker is the single writer for the key and the only
//! holder of its cached [`VersionHistory`].

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use vds_store::{Backend, BlockStore, ImmutableBlock, PutOutcome};
use vds_types::{DataKey, Digest, VersionName};
use vds_versions::VersionHistory;

use crate::error::DataStoreResult;
use crate::hook::OwnershipHook;
use crate::policy;

pub(crate) type Reply<T> = oneshot::Sender<DataStoreResult<T>>;

/// State shared by every worker.
pub(crate) struct Shared {
    pub(crate) blocks: BlockStore,
    pub(crate) histories: Box<dyn Backend>,
    pub(crate) hook: Arc<dyn OwnershipHook>,
    pub(crate) max_versions: usize,
}

/// A request queued for a worker.
///
/// History requests carry `slot`, the storage key derived from the
/// [`DataKey`], so the worker does not hash it again.
pub(crate) enum Request {
    Put {
        block: ImmutableBlock,
        reply: Reply<PutOutcome>,
    },
    Get {
        name: Digest,
        reply: Reply<ImmutableBlock>,
    },
    Delete {
        name: Digest,
        reply: Reply<()>,
    },
    PutVersion {
        key: DataKey,
        slot: Digest,
        old: Option<VersionName>,
        new: VersionName,
        reply: Reply<Vec<VersionName>>,
    },
    GetVersions {
        key: DataKey,
        slot: Digest,
        reply: Reply<Vec<VersionName>>,
    },
    GetBranch {
        key: DataKey,
        slot: Digest,
        version: VersionName,
        reply: Reply<Vec<VersionName>>,
    },
    DeleteBranchUntilFork {
        key: DataKey,
        slot: Digest,
        tip: VersionName,
        reply: Reply<Vec<VersionName>>,
    },
}

pub(crate) struct Worker {
    id: usize,
    shared: Arc<Shared>,
    histories: HashMap<DataKey, VersionHistory>,
    empty: VersionHistory,
}

impl Worker {
    /// Start worker `id` on its own thread.
    pub(crate) fn spawn(
        id: usize,
        shared: Arc<Shared>,
    ) -> std::io::Result<(mpsc::UnboundedSender<Request>, JoinHandle<()>)> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = thread::Builder::new()
            .name(format!("vds-worker-{id}"))
            .spawn(move || {
                let mut worker = Worker {
                    id,
                    empty: VersionHistory::new(shared.max_versions),
                    shared,
                    histories: HashMap::new(),
                };
                while let Some(request) = rx.blocking_recv() {
                    worker.handle(request);
                }
                debug!(worker = id, "worker shutting down");
            })?;
        Ok((tx, handle))
    }

    fn handle(&mut self, request: Request) {
        // A send error only means the caller dropped its `Pending`.
        match request {
            Request::Put { block, reply } => {
                let _ = reply.send(self.put(&block));
            }
            Request::Get { name, reply } => {
                let _ = reply.send(self.get(&name));
            }
            Request::Delete { name, reply } => {
                let _ = reply.send(self.delete(&name));
            }
            Request::PutVersion {
                key,
                slot,
                old,
                new,
                reply,
            } => {
                let _ = reply.send(self.put_version(key, &slot, old.as_ref(), new));
            }
            Request::GetVersions { key, slot, reply } => {
                let _ = reply.send(self.load(&key, &slot).map(|h| h.tips()));
            }
            Request::GetBranch {
                key,
                slot,
                version,
                reply,
            } => {
                let result = self
                    .load(&key, &slot)
                    .and_then(|h| Ok(h.branch(&version)?));
                let _ = reply.send(result);
            }
            Request::DeleteBranchUntilFork {
                key,
                slot,
                tip,
                reply,
            } => {
                let _ = reply.send(self.delete_branch(key, &slot, &tip));
            }
        }
    }

    // ---------------------------------------------------------------
    // Blocks
    // ---------------------------------------------------------------

    fn put(&self, block: &ImmutableBlock) -> DataStoreResult<PutOutcome> {
        let outcome = self.shared.blocks.put(block)?;
        debug!(worker = self.id, name = %block.name.short_hex(), ?outcome, "put");
        Ok(outcome)
    }

    fn get(&self, name: &Digest) -> DataStoreResult<ImmutableBlock> {
        Ok(self.shared.blocks.get(name)?)
    }

    fn delete(&self, name: &Digest) -> DataStoreResult<()> {
        let freed = self.shared.blocks.delete(name)?;
        debug!(worker = self.id, name = %name.short_hex(), ?freed, "delete");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Histories
    // ---------------------------------------------------------------

    fn put_version(
        &mut self,
        key: DataKey,
        slot: &Digest,
        old: Option<&VersionName>,
        new: VersionName,
    ) -> DataStoreResult<Vec<VersionName>> {
        policy::authorize_edit(self.shared.hook.as_ref(), &key, old, &new)?;

        let mut history = self.load(&key, slot)?.clone();
        let pruned = history.put(old, new)?;
        self.commit(key, slot, history)?;

        debug!(worker = self.id, %key, version = ?new, pruned = pruned.len(), "put version");
        Ok(pruned)
    }

    fn delete_branch(
        &mut self,
        key: DataKey,
        slot: &Digest,
        tip: &VersionName,
    ) -> DataStoreResult<Vec<VersionName>> {
        policy::authorize_delete(self.shared.hook.as_ref(), &key, tip)?;

        let mut history = self.load(&key, slot)?.clone();
        let removed = history.delete_branch_until_fork(tip)?;
        self.commit(key, slot, history)?;

        debug!(worker = self.id, %key, ?tip, removed = removed.len(), "delete branch");
        Ok(removed)
    }

    /// The history for `key`, read from the backend on first use.
    ///
    /// Only non-empty histories are cached.
    fn load(&mut self, key: &DataKey, slot: &Digest) -> DataStoreResult<&VersionHistory> {
        if !self.histories.contains_key(key) {
            let Some(bytes) = self.shared.histories.read(slot)? else {
                return Ok(&self.empty);
            };
            let mut history = VersionHistory::from_bytes(&bytes)?;
            history.set_max_versions(self.shared.max_versions);
            debug!(worker = self.id, %key, versions = history.len(), "loaded history");
            self.histories.insert(*key, history);
        }
        Ok(&self.histories[key])
    }

    /// Persist `history` and make it the cached copy. Nothing changes if
    /// the write fails.
    fn commit(&mut self, key: DataKey, slot: &Digest, history: VersionHistory) -> DataStoreResult<()> {
        if history.is_empty() {
            self.shared.histories.delete(slot)?;
            self.histories.remove(&key);
        } else {
            self.shared.histories.write(slot, &history.to_bytes()?)?;
            self.histories.insert(key, history);
        }
        Ok(())
    }
}
