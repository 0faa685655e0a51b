//! Per-kind rules for editing and deleting versioned data.
//!
//! Every [`DataKind`] maps to one [`KindPolicy`] row:
//!
//! | kind           | put-version  | delete-branch |
//! |----------------|--------------|---------------|
//! | immutable      | deny         | deny          |
//! | mutable-owned  | check owner  | check owner   |
//! | appendable     | allow        | check owner   |
//! | signature-only | deny         | check owner   |
//!
//! Block puts are governed by the content hash alone, and reads are never
//! restricted.

use tracing::warn;
use vds_types::{DataKey, DataKind, VersionName};

use crate::error::{DataStoreError, DataStoreResult};
use crate::hook::{HookDecision, OwnershipHook};

/// What to do with one kind of request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    Allow,
    Deny,
    /// Ask the [`OwnershipHook`].
    CheckOwner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindPolicy {
    pub edit: Rule,
    pub delete: Rule,
}

impl KindPolicy {
    pub const fn of(kind: DataKind) -> Self {
        match kind {
            DataKind::Immutable => Self {
                edit: Rule::Deny,
                delete: Rule::Deny,
            },
            DataKind::MutableOwned => Self {
                edit: Rule::CheckOwner,
                delete: Rule::CheckOwner,
            },
            DataKind::Appendable => Self {
                edit: Rule::Allow,
                delete: Rule::CheckOwner,
            },
            DataKind::SignatureOnly => Self {
                edit: Rule::Deny,
                delete: Rule::CheckOwner,
            },
        }
    }
}

pub(crate) fn authorize_edit(
    hook: &dyn OwnershipHook,
    key: &DataKey,
    old: Option<&VersionName>,
    new: &VersionName,
) -> DataStoreResult<()> {
    match KindPolicy::of(key.kind).edit {
        Rule::Allow => Ok(()),
        Rule::Deny => Err(DataStoreError::EditNotPermitted {
            kind: key.kind,
            operation: "put-version",
        }),
        Rule::CheckOwner => settle(key, hook.check_edit(key, old, new)),
    }
}

pub(crate) fn authorize_delete(
    hook: &dyn OwnershipHook,
    key: &DataKey,
    tip: &VersionName,
) -> DataStoreResult<()> {
    match KindPolicy::of(key.kind).delete {
        Rule::Allow => Ok(()),
        Rule::Deny => Err(DataStoreError::EditNotPermitted {
            kind: key.kind,
            operation: "delete-branch",
        }),
        Rule::CheckOwner => settle(key, hook.check_delete(key, tip)),
    }
}

fn settle(key: &DataKey, decision: HookDecision) -> DataStoreResult<()> {
    match decision {
        HookDecision::Allow => Ok(()),
        HookDecision::Reject { reason } => {
            warn!(%key, %reason, "ownership hook rejected request");
            Err(DataStoreError::PermissionDenied { key: *key, reason })
        }
    }
}
