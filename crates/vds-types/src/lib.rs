//! Foundation types for the vault data store (VDS).
//!
//! This crate provides the identity and structural types shared by every
//! other VDS crate.
//!
//! # Key Types
//!
//! - [`Digest`]: Fixed-width content hash naming blocks and versions
//! - [`DataKind`]: Closed set of data kinds (immutable, mutable-owned, ...)
//! - [`DataKey`]: `(kind, name)` pair that keys a version history
//! - [`VersionName`]: `(index, id)` pair naming one version of a history
//! - [`DiskUsage`]: Byte count used for disk accounting

pub mod digest;
pub mod error;
pub mod kind;
pub mod usage;
pub mod version;

pub use digest::Digest;
pub use error::TypeError;
pub use kind::{DataKey, DataKind};
pub use usage::DiskUsage;
pub use version::VersionName;
