//! Version graph manager for the vault data store.
//!
//! Each data key owns a [`VersionHistory`]: an arena of [`VersionEntry`]
//! nodes addressed by [`VersionName`](vds_types::VersionName), with parent
//! and child links stored as keys rather than pointers. The history tracks
//! its tips, walks branches back to the root, deletes a branch up to the
//! nearest fork, and prunes old roots to stay within a configured bound.

pub mod entry;
pub mod error;
pub mod history;

pub use entry::VersionEntry;
pub use error::{VersionError, VersionResult};
pub use history::VersionHistory;
