use vds_types::{DataKey, VersionName};

/// Outcome of an ownership check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookDecision {
    Allow,
    Reject { reason: String },
}

/// Pass-through ownership validation for owner-restricted data kinds.
///
/// The store calls the hook on its worker thread, before the operation
/// touches any state. Which kinds consult the hook is decided by
/// [`KindPolicy`](crate::KindPolicy).
pub trait OwnershipHook: Send + Sync {
    /// Called before `new` is recorded after `old`.
    fn check_edit(
        &self,
        key: &DataKey,
        old: Option<&VersionName>,
        new: &VersionName,
    ) -> HookDecision;

    /// Called before the branch ending at `tip` is deleted.
    fn check_delete(&self, key: &DataKey, tip: &VersionName) -> HookDecision;
}

/// Hook that approves everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl OwnershipHook for AllowAll {
    fn check_edit(&self, _: &DataKey, _: Option<&VersionName>, _: &VersionName) -> HookDecision {
        HookDecision::Allow
    }

    fn check_delete(&self, _: &DataKey, _: &VersionName) -> HookDecision {
        HookDecision::Allow
    }
}
