//! The per-key version forest and its editing operations.
//!
//! [`VersionHistory`] stores entries in a [`HashMap`] keyed by
//! [`VersionName`]; parent and child links are keys into that map. A
//! separate ordered set tracks the current tips.
//!
//! # Invariants
//!
//! - `roots` holds exactly the parentless entries. A single `put(None, _)`
//!   starts the history; further roots only appear when pruning removes a
//!   node and re-roots its children.
//! - Every parent and child key resolves to an entry, and links are
//!   symmetric.
//! - A child's index is strictly greater than its parent's.
//! - `tips` holds exactly the entries without children.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vds_types::VersionName;

use crate::entry::VersionEntry;
use crate::error::{VersionError, VersionResult};

/// Version forest for one data key, bounded by `max_versions` entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHistory {
    entries: HashMap<VersionName, VersionEntry>,
    tips: BTreeSet<VersionName>,
    roots: BTreeSet<VersionName>,
    max_versions: usize,
}

impl VersionHistory {
    /// Create an empty history holding at most `max_versions` entries.
    pub fn new(max_versions: usize) -> Self {
        Self {
            entries: HashMap::new(),
            tips: BTreeSet::new(),
            roots: BTreeSet::new(),
            max_versions,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_versions(&self) -> usize {
        self.max_versions
    }

    /// Change the bound. Takes effect on the next [`put`](Self::put).
    pub fn set_max_versions(&mut self, max_versions: usize) {
        self.max_versions = max_versions;
    }

    pub fn contains(&self, version: &VersionName) -> bool {
        self.entries.contains_key(version)
    }

    pub fn get(&self, version: &VersionName) -> Option<&VersionEntry> {
        self.entries.get(version)
    }

    /// The oldest root, if any.
    pub fn root(&self) -> Option<&VersionName> {
        self.roots.first()
    }

    /// Every parentless version, ascending.
    pub fn roots(&self) -> Vec<VersionName> {
        self.roots.iter().copied().collect()
    }

    /// All retained versions, ascending.
    pub fn versions(&self) -> Vec<VersionName> {
        let mut all: Vec<VersionName> = self.entries.keys().copied().collect();
        all.sort();
        all
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Record `new` as a child of `old`, or as the root when `old` is `None`.
    ///
    /// A second child under the same `old` creates a fork. If the history
    /// then holds more than `max_versions` entries, the oldest unprotected
    /// versions are pruned (see [`prune`](Self::prune)); the pruned versions are returned oldest first. On any error the
    /// history is left exactly as it was.
    pub fn put(
        &mut self,
        old: Option<&VersionName>,
        new: VersionName,
    ) -> VersionResult<Vec<VersionName>> {
        let mut staged = self.clone();
        staged.insert(old, new)?;
        let pruned = staged.prune();
        if staged.len() > staged.max_versions {
            return Err(VersionError::HistoryFull {
                max: self.max_versions,
            });
        }

        debug!(version = ?new, parent = ?old, pruned = pruned.len(), "put version");
        *self = staged;
        Ok(pruned)
    }

    fn insert(&mut self, old: Option<&VersionName>, new: VersionName) -> VersionResult<()> {
        match old {
            None => {
                if !self.is_empty() {
                    return Err(VersionError::RootExists);
                }
                self.entries.insert(new, VersionEntry::root(new));
                self.roots.insert(new);
            }
            Some(parent) => {
                if !self.entries.contains_key(parent) {
                    return Err(VersionError::NotFound(*parent));
                }
                if self.entries.contains_key(&new) {
                    return Err(VersionError::AlreadyExists(new));
                }
                if new.index <= parent.index {
                    return Err(VersionError::InvalidVersion {
                        parent: *parent,
                        child: new,
                    });
                }
                if let Some(parent_entry) = self.entries.get_mut(parent) {
                    parent_entry.children.insert(new);
                }
                self.tips.remove(parent);
                self.entries.insert(new, VersionEntry::child(new, *parent));
            }
        }
        self.tips.insert(new);
        Ok(())
    }

    /// Drop the oldest unprotected versions until the bound holds.
    ///
    /// A tip is protected, and so is every version from a tip down to its
    /// nearest fork, the fork included. A tip whose line reaches a root
    /// without meeting a fork protects only itself, so a plain chain still
    /// loses its oldest end. A pruned version's children become roots.
    fn prune(&mut self) -> Vec<VersionName> {
        let mut pruned = Vec::new();
        while self.entries.len() > self.max_versions {
            let protected = self.protected();
            let victim = self
                .entries
                .values()
                .filter(|e| !protected.contains(&e.version))
                .filter(|e| self.keeps_parent_alive(e))
                .map(|e| e.version)
                .min();
            let Some(victim) = victim else { break };
            self.detach(&victim);
            pruned.push(victim);
        }

        if !pruned.is_empty() {
            info!(
                count = pruned.len(),
                roots = self.roots.len(),
                max = self.max_versions,
                "pruned old versions"
            );
        }
        pruned
    }

    fn protected(&self) -> HashSet<VersionName> {
        let mut protected: HashSet<VersionName> = self.tips.iter().copied().collect();
        let mut segment = Vec::new();
        for tip in &self.tips {
            segment.clear();
            let mut current = self.entries.get(tip).and_then(|e| e.parent);
            while let Some(name) = current {
                let Some(entry) = self.entries.get(&name) else { break };
                segment.push(name);
                if entry.is_fork() {
                    protected.extend(segment.drain(..));
                    break;
                }
                current = entry.parent;
            }
        }
        protected
    }

    /// Removing `entry` must not leave its parent childless, which would
    /// turn the parent into a tip.
    fn keeps_parent_alive(&self, entry: &VersionEntry) -> bool {
        match &entry.parent {
            None => true,
            Some(parent) => self
                .entries
                .get(parent)
                .is_some_and(|p| p.children.len() > 1),
        }
    }

    fn detach(&mut self, version: &VersionName) {
        let Some(entry) = self.entries.remove(version) else {
            return;
        };
        self.roots.remove(version);
        if let Some(parent) = entry.parent {
            if let Some(parent_entry) = self.entries.get_mut(&parent) {
                parent_entry.children.remove(version);
            }
        }
        for child in &entry.children {
            if let Some(child_entry) = self.entries.get_mut(child) {
                child_entry.parent = None;
                self.roots.insert(*child);
            }
        }
    }

    /// Delete `tip` and every ancestor up to, but not including, the
    /// nearest fork.
    ///
    /// With no fork on the way the root goes too; if it was the only root
    /// the history ends up empty. Returns the removed versions, most recent first.
    pub fn delete_branch_until_fork(&mut self, tip: &VersionName) -> VersionResult<Vec<VersionName>> {
        let entry = self
            .entries
            .get(tip)
            .ok_or(VersionError::NotFound(*tip))?;
        if !entry.is_tip() {
            return Err(VersionError::NotATip(*tip));
        }

        let mut staged = self.clone();
        let mut removed = Vec::new();
        let mut current = *tip;
        loop {
            let entry = staged
                .entries
                .remove(&current)
                .ok_or_else(|| VersionError::Corrupt(format!("missing entry {current:?}")))?;
            staged.tips.remove(&current);
            removed.push(current);

            let Some(parent) = entry.parent else {
                staged.roots.remove(&current);
                break;
            };
            let parent_entry = staged.entries.get_mut(&parent).ok_or_else(|| {
                VersionError::Corrupt(format!("{current:?} has missing parent {parent:?}"))
            })?;
            parent_entry.children.remove(&current);
            if !parent_entry.children.is_empty() {
                break;
            }
            current = parent;
        }

        debug!(tip = ?tip, removed = removed.len(), "deleted branch");
        *self = staged;
        Ok(removed)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Current tips, ascending by `(index, id)`.
    pub fn tips(&self) -> Vec<VersionName> {
        self.tips.iter().copied().collect()
    }

    /// Walk from `version` to its root, most recent first.
    pub fn branch(&self, version: &VersionName) -> VersionResult<Vec<VersionName>> {
        if !self.entries.contains_key(version) {
            return Err(VersionError::NotFound(*version));
        }

        let mut chain = Vec::new();
        let mut current = Some(*version);
        while let Some(name) = current {
            if chain.len() >= self.entries.len() {
                return Err(VersionError::Corrupt(format!("cycle through {name:?}")));
            }
            let entry = self.entries.get(&name).ok_or_else(|| {
                VersionError::Corrupt(format!("dangling parent {name:?}"))
            })?;
            chain.push(name);
            current = entry.parent;
        }
        Ok(chain)
    }

    /// Check the arena's structural invariants.
    pub fn validate(&self) -> VersionResult<()> {
        let corrupt = |msg: String| Err(VersionError::Corrupt(msg));

        let parentless: BTreeSet<VersionName> = self
            .entries
            .values()
            .filter(|e| e.is_root())
            .map(|e| e.version)
            .collect();
        if parentless != self.roots {
            return corrupt(format!("roots {:?} vs parentless {parentless:?}", self.roots));
        }
        if self.entries.is_empty() != self.roots.is_empty() {
            return corrupt("non-empty history without a root".to_string());
        }

        for (key, entry) in &self.entries {
            if *key != entry.version {
                return corrupt(format!("{key:?} stored as {:?}", entry.version));
            }
            if let Some(parent) = &entry.parent {
                let Some(parent_entry) = self.entries.get(parent) else {
                    return corrupt(format!("{key:?} has missing parent {parent:?}"));
                };
                if !parent_entry.children.contains(key) {
                    return corrupt(format!("{parent:?} does not list child {key:?}"));
                }
                if parent.index >= key.index {
                    return corrupt(format!("{key:?} does not follow {parent:?}"));
                }
            }
            for child in &entry.children {
                match self.entries.get(child) {
                    Some(child_entry) if child_entry.parent == Some(*key) => {}
                    _ => return corrupt(format!("{key:?} lists stray child {child:?}")),
                }
            }
            if entry.is_tip() != self.tips.contains(key) {
                return corrupt(format!("tip set disagrees on {key:?}"));
            }
        }
        if self.tips.iter().any(|tip| !self.entries.contains_key(tip)) {
            return corrupt("tip set lists a missing version".to_string());
        }

        // Strictly increasing indices already rule out cycles, so every
        // entry reaches one of the roots.
        Ok(())
    }

    // ---------------------------------------------------------------
    // Serialization helpers
    // ---------------------------------------------------------------

    /// Serialize the history to bincode bytes.
    pub fn to_bytes(&self) -> VersionResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| VersionError::Serialization(e.to_string()))
    }

    /// Deserialize and validate a history from bincode bytes.
    pub fn from_bytes(data: &[u8]) -> VersionResult<Self> {
        let history: Self =
            bincode::deserialize(data).map_err(|e| VersionError::Serialization(e.to_string()))?;
        history.validate()?;
        Ok(history)
    }
}
