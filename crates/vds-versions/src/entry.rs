use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use vds_types::VersionName;

/// One node of a version history.
///
/// Links to other nodes are held as [`VersionName`] keys into the owning
/// history's arena. `parent` is `None` only for the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: VersionName,
    pub parent: Option<VersionName>,
    pub children: BTreeSet<VersionName>,
}

impl VersionEntry {
    /// A root entry (no parent, no children).
    pub fn root(version: VersionName) -> Self {
        Self {
            version,
            parent: None,
            children: BTreeSet::new(),
        }
    }

    /// A fresh child of `parent`.
    pub fn child(version: VersionName, parent: VersionName) -> Self {
        Self {
            version,
            parent: Some(parent),
            children: BTreeSet::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns `true` if nothing descends from this entry.
    pub fn is_tip(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` if two or more branches diverge here.
    pub fn is_fork(&self) -> bool {
        self.children.len() > 1
    }
}
