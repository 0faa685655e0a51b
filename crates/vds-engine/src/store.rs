use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use vds_crypto::ContentHasher;
use vds_store::{Backend, BlockStore, FileBackend, ImmutableBlock, MemoryBackend, PutOutcome};
use vds_types::{DataKey, DataKind, Digest, DiskUsage, VersionName};

use crate::config::StoreConfig;
use crate::error::{DataStoreError, DataStoreResult};
use crate::hook::{AllowAll, OwnershipHook};
use crate::pending::Pending;
use crate::worker::{Reply, Request, Shared, Worker};

const BLOCKS_DIR: &str = "blocks";
const VERSIONS_DIR: &str = "versions";

/// The vault data store.
///
/// Blocks are routed to a worker by name, histories by the storage key of
/// their [`DataKey`]. All methods take `&self`; share the store across
/// tasks with an `Arc`.
pub struct DataStore {
    shared: Arc<Shared>,
    queues: Vec<mpsc::UnboundedSender<Request>>,
    workers: Vec<JoinHandle<()>>,
}

impl DataStore {
    /// Open (or create) a filesystem-backed store under `config.root`.
    pub fn open(config: StoreConfig) -> DataStoreResult<Self> {
        config.validate()?;
        let blocks = FileBackend::open(config.root.join(BLOCKS_DIR), config.sync)?;
        let histories = FileBackend::open(config.root.join(VERSIONS_DIR), config.sync)?;
        Self::with_backends(config, Box::new(blocks), Box::new(histories), Arc::new(AllowAll))
    }

    /// A store that keeps everything in memory. `config.root` is ignored.
    pub fn in_memory(config: StoreConfig) -> DataStoreResult<Self> {
        Self::with_backends(
            config,
            Box::new(MemoryBackend::new()),
            Box::new(MemoryBackend::new()),
            Arc::new(AllowAll),
        )
    }

    /// Assemble a store from explicit backends and an ownership hook.
    pub fn with_backends(
        config: StoreConfig,
        blocks: Box<dyn Backend>,
        histories: Box<dyn Backend>,
        hook: Arc<dyn OwnershipHook>,
    ) -> DataStoreResult<Self> {
        config.validate()?;
        let shared = Arc::new(Shared {
            blocks: BlockStore::open(blocks, config.max_disk_usage)?,
            histories,
            hook,
            max_versions: config.max_versions,
        });

        let mut store = Self {
            shared,
            queues: Vec::with_capacity(config.workers),
            workers: Vec::with_capacity(config.workers),
        };
        for id in 0..config.workers {
            let (queue, handle) = Worker::spawn(id, Arc::clone(&store.shared))
                .map_err(|e| worker_start_failed(id, e))?;
            store.queues.push(queue);
            store.workers.push(handle);
        }

        info!(
            root = %config.root.display(),
            workers = config.workers,
            max_disk_usage = config.max_disk_usage,
            max_versions = config.max_versions,
            "data store opened"
        );
        Ok(store)
    }

    // ---------------------------------------------------------------
    // Blocks
    // ---------------------------------------------------------------

    /// Store an immutable block. Storing the same block twice is a no-op.
    pub fn put(&self, block: ImmutableBlock) -> Pending<PutOutcome> {
        let route = block.name;
        self.submit(&route, |reply| Request::Put { block, reply })
    }

    /// Fetch a block, verified against its name.
    pub fn get(&self, name: Digest) -> Pending<ImmutableBlock> {
        self.submit(&name, |reply| Request::Get { name, reply })
    }

    /// Remove a block. Removing an absent block is a no-op.
    pub fn delete(&self, name: Digest) -> Pending<()> {
        self.submit(&name, |reply| Request::Delete { name, reply })
    }

    // ---------------------------------------------------------------
    // Versions
    // ---------------------------------------------------------------

    /// Record `new` after `old` in the history of `(kind, name)`.
    ///
    /// `old` is `None` only for the first version of an empty history.
    /// Resolves to the versions pruned to keep the history within bounds.
    pub fn put_version(
        &self,
        kind: DataKind,
        name: Digest,
        old: Option<VersionName>,
        new: VersionName,
    ) -> Pending<Vec<VersionName>> {
        let key = DataKey::new(kind, name);
        let slot = ContentHasher::HISTORY.hash_key(&key);
        self.submit(&slot, |reply| Request::PutVersion {
            key,
            slot,
            old,
            new,
            reply,
        })
    }

    /// Current tips of `(kind, name)`, ascending. Empty if there is no
    /// history.
    pub fn get_versions(&self, kind: DataKind, name: Digest) -> Pending<Vec<VersionName>> {
        let key = DataKey::new(kind, name);
        let slot = ContentHasher::HISTORY.hash_key(&key);
        self.submit(&slot, |reply| Request::GetVersions { key, slot, reply })
    }

    /// The chain from `version` back to the root, most recent first.
    pub fn get_branch(
        &self,
        kind: DataKind,
        name: Digest,
        version: VersionName,
    ) -> Pending<Vec<VersionName>> {
        let key = DataKey::new(kind, name);
        let slot = ContentHasher::HISTORY.hash_key(&key);
        self.submit(&slot, |reply| Request::GetBranch {
            key,
            slot,
            version,
            reply,
        })
    }

    /// Delete the branch ending at `tip` down to its nearest fork.
    ///
    /// Resolves to the removed versions, most recent first.
    pub fn delete_branch_until_fork(
        &self,
        kind: DataKind,
        name: Digest,
        tip: VersionName,
    ) -> Pending<Vec<VersionName>> {
        let key = DataKey::new(kind, name);
        let slot = ContentHasher::HISTORY.hash_key(&key);
        self.submit(&slot, |reply| Request::DeleteBranchUntilFork {
            key,
            slot,
            tip,
            reply,
        })
    }

    // ---------------------------------------------------------------
    // Usage
    // ---------------------------------------------------------------

    /// Snapshot of the aggregate size of stored blocks. May lag requests
    /// still in flight.
    pub fn current_disk_usage(&self) -> DiskUsage {
        self.shared.blocks.usage()
    }

    pub fn max_disk_usage(&self) -> DiskUsage {
        self.shared.blocks.max_usage()
    }

    /// Stop accepting work, let the workers drain their queues, and wait
    /// for them to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.queues.clear();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
        info!(usage = %self.shared.blocks.usage(), "data store shut down");
    }

    fn submit<T>(&self, route: &Digest, request: impl FnOnce(Reply<T>) -> Request) -> Pending<T> {
        let (reply, rx) = oneshot::channel();
        // If the worker is gone the request, and with it `reply`, is
        // dropped, and the `Pending` resolves to `Shutdown`.
        let _ = self.queues[self.route(route)].send(request(reply));
        Pending::new(rx)
    }

    fn route(&self, key: &Digest) -> usize {
        let prefix = key
            .as_bytes()
            .iter()
            .take(8)
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        (prefix % self.queues.len() as u64) as usize
    }
}

/// A store that cannot start its workers was never opened.
fn worker_start_failed(id: usize, err: std::io::Error) -> DataStoreError {
    DataStoreError::Config(format!("cannot start worker {id}: {err}"))
}

impl Drop for DataStore {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("workers", &self.workers.len())
            .field("usage", &self.shared.blocks.usage())
            .field("max", &self.shared.blocks.max_usage())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hook::HookDecision;
    use tempfile::TempDir;

    fn config(max_disk_usage: u64) -> StoreConfig {
        StoreConfig::new("unused", max_disk_usage)
    }

    fn name(byte: u8) -> Digest {
        Digest::from_hash([byte; 32])
    }

    fn v(index: u64, payload: &[u8]) -> VersionName {
        VersionName::new(index, ContentHasher::VERSION.hash(payload))
    }

    /// Lets only `owner` edit or delete; identifies the owner by the first
    /// byte of the data name.
    struct OwnerByte(u8);

    impl OwnershipHook for OwnerByte {
        fn check_edit(
            &self,
            key: &DataKey,
            _: Option<&VersionName>,
            _: &VersionName,
        ) -> HookDecision {
            self.check(key)
        }

        fn check_delete(&self, key: &DataKey, _: &VersionName) -> HookDecision {
            self.check(key)
        }
    }

    impl OwnerByte {
        fn check(&self, key: &DataKey) -> HookDecision {
            if key.name.as_bytes()[0] == self.0 {
                HookDecision::Allow
            } else {
                HookDecision::Reject {
                    reason: "wrong owner".into(),
                }
            }
        }
    }

    fn with_hook(hook: impl OwnershipHook + 'static) -> DataStore {
        DataStore::with_backends(
            config(1_000),
            Box::new(MemoryBackend::new()),
            Box::new(MemoryBackend::new()),
            Arc::new(hook),
        )
        .unwrap()
    }

    // ----------------------------------------------------------
    // Blocks
    // ----------------------------------------------------------

    #[tokio::test]
    async fn hundred_byte_put_then_delete() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        let block = ImmutableBlock::new(vec![0x42; 100]);
        let block_name = block.name;

        assert_eq!(store.put(block).await.unwrap(), PutOutcome::Stored);
        assert_eq!(store.current_disk_usage(), DiskUsage(100));

        store.delete(block_name).await.unwrap();
        assert_eq!(store.current_disk_usage(), DiskUsage::ZERO);
    }

    #[tokio::test]
    async fn repeated_put_is_charged_once() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        let block = ImmutableBlock::new(vec![7; 64]);
        store.put(block.clone()).await.unwrap();
        assert_eq!(store.put(block).await.unwrap(), PutOutcome::AlreadyPresent);
        assert_eq!(store.current_disk_usage(), DiskUsage(64));
    }

    #[tokio::test]
    async fn delete_restores_prior_usage() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        store.put(ImmutableBlock::new(vec![1; 30])).await.unwrap();
        let before = store.current_disk_usage();

        let block = ImmutableBlock::new(vec![2; 50]);
        let block_name = block.name;
        store.put(block).await.unwrap();
        store.delete(block_name).await.unwrap();
        store.delete(block_name).await.unwrap();
        assert_eq!(store.current_disk_usage(), before);
    }

    #[tokio::test]
    async fn get_returns_the_named_block() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        let block = ImmutableBlock::new(b"payload".to_vec());
        let block_name = block.name;
        store.put(block.clone()).await.unwrap();

        let fetched = store.get(block_name).await.unwrap();
        assert_eq!(fetched.name, block_name);
        assert_eq!(ContentHasher::BLOCK.hash(&fetched.data), block_name);
        assert!(fetched == block);

        let err = store.get(name(9)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn over_limit_put_is_rejected() {
        let store = DataStore::in_memory(config(100)).unwrap();
        store.put(ImmutableBlock::new(vec![1; 80])).await.unwrap();

        let err = store.put(ImmutableBlock::new(vec![2; 21])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DiskUsageExceeded);
        assert_eq!(store.current_disk_usage(), DiskUsage(80));
    }

    #[tokio::test]
    async fn forged_block_is_rejected() {
        let store = DataStore::in_memory(config(100)).unwrap();
        let forged = ImmutableBlock::from_parts(name(1), b"not it".to_vec());
        let err = store.put(forged).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HashMismatch);
    }

    #[tokio::test]
    async fn dropped_handle_still_completes() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        let block = ImmutableBlock::new(b"fire and forget".to_vec());
        let block_name = block.name;

        drop(store.put(block));
        // Same name, same worker: the get is applied after the put.
        assert_eq!(store.get(block_name).await.unwrap().data, b"fire and forget");
    }

    // ----------------------------------------------------------
    // Versions
    // ----------------------------------------------------------

    #[tokio::test]
    async fn linear_chain_lifecycle() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        let kind = DataKind::MutableOwned;
        let data = name(1);
        let (v0, v1, v2) = (v(0, b"zero"), v(1, b"one"), v(2, b"two"));

        store.put_version(kind, data, None, v0).await.unwrap();
        store.put_version(kind, data, Some(v0), v1).await.unwrap();
        store.put_version(kind, data, Some(v1), v2).await.unwrap();

        assert_eq!(store.get_versions(kind, data).await.unwrap(), vec![v2]);
        assert_eq!(
            store.get_branch(kind, data, v2).await.unwrap(),
            vec![v2, v1, v0]
        );

        let removed = store.delete_branch_until_fork(kind, data, v2).await.unwrap();
        assert_eq!(removed, vec![v2, v1, v0]);
        assert!(store.get_versions(kind, data).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fork_delete_leaves_sibling() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        let kind = DataKind::Appendable;
        let data = name(2);
        let (root, a, b) = (v(0, b"root"), v(1, b"a"), v(1, b"b"));

        store.put_version(kind, data, None, root).await.unwrap();
        store.put_version(kind, data, Some(root), a).await.unwrap();
        store.put_version(kind, data, Some(root), b).await.unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.get_versions(kind, data).await.unwrap(), expected);

        let removed = store.delete_branch_until_fork(kind, data, a).await.unwrap();
        assert_eq!(removed, vec![a]);
        assert_eq!(store.get_versions(kind, data).await.unwrap(), vec![b]);
        assert_eq!(store.get_branch(kind, data, b).await.unwrap(), vec![b, root]);
    }

    #[tokio::test]
    async fn version_errors_surface_with_their_kind() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        let kind = DataKind::MutableOwned;
        let data = name(3);
        let v0 = v(0, b"zero");
        store.put_version(kind, data, None, v0).await.unwrap();

        let err = store.put_version(kind, data, None, v(1, b"x")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let err = store
            .put_version(kind, data, Some(v(5, b"ghost")), v(6, b"y"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = store.put_version(kind, data, Some(v0), v0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let err = store.get_branch(kind, data, v(9, b"nope")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn kinds_do_not_share_histories() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        let data = name(4);
        let v0 = v(0, b"zero");

        store
            .put_version(DataKind::MutableOwned, data, None, v0)
            .await
            .unwrap();
        assert!(store
            .get_versions(DataKind::Appendable, data)
            .await
            .unwrap()
            .is_empty());
        store
            .put_version(DataKind::Appendable, data, None, v0)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn queued_versions_apply_in_submission_order() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        let kind = DataKind::Appendable;
        let data = name(5);
        let chain: Vec<VersionName> = (0..20u64).map(|i| v(i, &i.to_le_bytes())).collect();

        let mut pending = vec![store.put_version(kind, data, None, chain[0])];
        for pair in chain.windows(2) {
            pending.push(store.put_version(kind, data, Some(pair[0]), pair[1]));
        }
        for p in pending {
            p.await.unwrap();
        }

        let branch = store.get_branch(kind, data, chain[19]).await.unwrap();
        assert_eq!(branch, chain.iter().rev().copied().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn long_chain_is_pruned_to_bound() {
        let cfg = StoreConfig {
            max_versions: 5,
            ..config(1_000)
        };
        let store = DataStore::in_memory(cfg).unwrap();
        let kind = DataKind::Appendable;
        let data = name(6);

        let mut previous = None;
        for i in 0..12u64 {
            let next = v(i, &i.to_le_bytes());
            store.put_version(kind, data, previous, next).await.unwrap();
            previous = Some(next);
        }

        let tip = previous.unwrap();
        let branch = store.get_branch(kind, data, tip).await.unwrap();
        assert_eq!(branch.len(), 5);
        assert_eq!(branch[0], tip);
        assert_eq!(branch[4].index, 7);
    }

    // ----------------------------------------------------------
    // Policy
    // ----------------------------------------------------------

    #[tokio::test]
    async fn immutable_and_signature_data_cannot_be_edited() {
        let store = DataStore::in_memory(config(1_000)).unwrap();
        for kind in [DataKind::Immutable, DataKind::SignatureOnly] {
            let err = store
                .put_version(kind, name(7), None, v(0, b"zero"))
                .await
                .unwrap_err();
            assert!(matches!(err, DataStoreError::EditNotPermitted { .. }));
            assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        }
    }

    #[tokio::test]
    async fn hook_guards_owned_data() {
        let store = with_hook(OwnerByte(8));
        let kind = DataKind::MutableOwned;
        let v0 = v(0, b"zero");

        store.put_version(kind, name(8), None, v0).await.unwrap();
        let err = store.put_version(kind, name(9), None, v0).await.unwrap_err();
        assert!(matches!(err, DataStoreError::PermissionDenied { .. }));
        assert!(store.get_versions(kind, name(9)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appendable_data_is_open_to_edits_not_deletes() {
        let store = with_hook(OwnerByte(0));
        let kind = DataKind::Appendable;
        let v0 = v(0, b"zero");

        store.put_version(kind, name(3), None, v0).await.unwrap();
        let err = store
            .delete_branch_until_fork(kind, name(3), v0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(store.get_versions(kind, name(3)).await.unwrap(), vec![v0]);
    }

    // ----------------------------------------------------------
    // Lifecycle
    // ----------------------------------------------------------

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let cfg = StoreConfig::new(dir.path(), 10_000);
        let kind = DataKind::MutableOwned;
        let data = name(10);
        let (v0, v1) = (v(0, b"zero"), v(1, b"one"));
        let block = ImmutableBlock::new(vec![3; 100]);
        let block_name = block.name;

        let store = DataStore::open(cfg.clone()).unwrap();
        store.put(block).await.unwrap();
        store.put_version(kind, data, None, v0).await.unwrap();
        store.put_version(kind, data, Some(v0), v1).await.unwrap();
        store.shutdown();

        let store = DataStore::open(cfg.clone()).unwrap();
        assert_eq!(store.current_disk_usage(), DiskUsage(100));
        assert_eq!(store.get(block_name).await.unwrap().data, vec![3; 100]);
        assert_eq!(store.get_branch(kind, data, v1).await.unwrap(), vec![v1, v0]);

        store.delete_branch_until_fork(kind, data, v1).await.unwrap();
        store.shutdown();

        let store = DataStore::open(cfg).unwrap();
        assert!(store.get_versions(kind, data).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn independent_keys_progress_concurrently() {
        let cfg = StoreConfig {
            workers: 4,
            ..config(1_000_000)
        };
        let store = Arc::new(DataStore::in_memory(cfg).unwrap());

        let tasks: Vec<_> = (0..16u8)
            .map(|n| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let kind = DataKind::Appendable;
                    let data = name(n);
                    let mut previous = None;
                    for i in 0..25u64 {
                        let next = v(i, &[n, i as u8]);
                        store.put_version(kind, data, previous, next).await.unwrap();
                        previous = Some(next);
                    }
                    store.put(ImmutableBlock::new(vec![n; 10])).await.unwrap();
                    store.get_versions(kind, data).await.unwrap()
                })
            })
            .collect();

        for (n, task) in tasks.into_iter().enumerate() {
            let tips = tokio::time::timeout(std::time::Duration::from_secs(30), task)
                .await
                .expect("keys should not block each other")
                .unwrap();
            assert_eq!(tips, vec![v(24, &[n as u8, 24])]);
        }
        assert_eq!(store.current_disk_usage(), DiskUsage(160));
    }

    #[test]
    fn invalid_config_fails_with_init() {
        let err = DataStore::in_memory(config(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Init);
    }

    #[test]
    fn worker_start_failure_is_an_init_error() {
        let err = worker_start_failed(2, std::io::Error::other("thread limit reached"));
        assert_eq!(err.kind(), ErrorKind::Init);
        assert!(err.to_string().contains("worker 2"));
    }

    #[test]
    fn unusable_root_fails_with_init() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let err = DataStore::open(StoreConfig::new(&file, 100)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Init);
    }
}
