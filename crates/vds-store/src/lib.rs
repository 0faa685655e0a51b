//! Content-addressed block storage for the vault data store.
//!
//! Every immutable block is stored under its BLAKE3 name (domain-separated,
//! see [`vds_crypto::ContentHasher::BLOCK`]). The aggregate size of stored
//! blocks is tracked against a configured ceiling; a put that would cross the
//! ceiling is rejected without touching storage or the counter.
//!
//! # Storage Backends
//!
//! All backends implement the [`Backend`] trait, a plain byte store keyed by
//! [`Digest`](vds_types::Digest):
//!
//! - [`MemoryBackend`] -- `HashMap`-based store for tests and embedding
//! - [`FileBackend`] -- one file per key under a two-level hex fan-out
//!
//! # Design Rules
//!
//! 1. Blocks are immutable once written; equal bytes always map to one name.
//! 2. Check-then-commit: usage is reserved atomically before the write and
//!    released if the write fails.
//! 3. Reads re-hash the stored bytes; corrupt blocks are never returned.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod block;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;
pub mod traits;
pub mod usage;

// Re-export primary types at crate root for ergonomic imports.
pub use block::ImmutableBlock;
pub use error::{StoreError, StoreResult};
pub use file::{FileBackend, SyncMode};
pub use memory::MemoryBackend;
pub use store::{BlockStore, PutOutcome};
pub use traits::Backend;
pub use usage::DiskUsageTracker;
