//! Asynchronous façade over the vault data store.
//!
//! [`DataStore`] composes the block store and the per-key version histories
//! behind a fixed pool of worker threads. Every request is routed to a
//! worker by its key, so operations on one key apply in submission order
//! while independent keys proceed in parallel. Each call returns a
//! [`Pending`] future; only [`DataStore::current_disk_usage`] is
//! synchronous.
//!
//! Data kinds are governed by a runtime policy table ([`KindPolicy`]) and an
//! optional [`OwnershipHook`] consulted for owner-restricted operations.

pub mod config;
pub mod error;
pub mod hook;
pub mod pending;
pub mod policy;
pub mod store;
mod worker;

pub use config::StoreConfig;
pub use error::{DataStoreError, DataStoreResult, ErrorKind};
pub use hook::{AllowAll, HookDecision, OwnershipHook};
pub use pending::Pending;
pub use policy::{KindPolicy, Rule};
pub use store::DataStore;
