use std::sync::atomic::{AtomicU64, Ordering};

use vds_types::DiskUsage;

use crate::error::{StoreError, StoreResult};

/// Running byte counter bounded by a fixed maximum.
///
/// `try_reserve` is the only way usage grows. It checks the limit and
/// commits the new total in a single compare-and-swap, so concurrent
/// reservations can never jointly overshoot the maximum, and a rejected
/// reservation leaves the counter untouched.
#[derive(Debug)]
pub struct DiskUsageTracker {
    usage: AtomicU64,
    max: u64,
}

impl DiskUsageTracker {
    /// A tracker starting at zero usage.
    pub fn new(max: u64) -> Self {
        Self::with_usage(max, 0)
    }

    /// A tracker seeded with usage recovered from existing storage.
    pub fn with_usage(max: u64, usage: u64) -> Self {
        Self {
            usage: AtomicU64::new(usage),
            max,
        }
    }

    /// Returns `true` if adding `additional` bytes would exceed the maximum.
    pub fn would_exceed(&self, additional: u64) -> bool {
        self.usage
            .load(Ordering::Acquire)
            .checked_add(additional)
            .map_or(true, |total| total > self.max)
    }

    /// Atomically add `bytes` if the result stays within the maximum.
    ///
    /// Returns the new usage on success.
    pub fn try_reserve(&self, bytes: u64) -> StoreResult<DiskUsage> {
        let max = self.max;
        self.usage
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(bytes).filter(|total| *total <= max)
            })
            .map(|previous| DiskUsage(previous + bytes))
            .map_err(|current| StoreError::DiskUsageExceeded {
                requested: bytes,
                usage: current,
                max,
            })
    }

    /// Give back `bytes` previously reserved. Never drops below zero.
    pub fn release(&self, bytes: u64) -> DiskUsage {
        let previous = self
            .usage
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(bytes))
            })
            .unwrap_or_else(|current| current);
        DiskUsage(previous.saturating_sub(bytes))
    }

    /// Snapshot of current usage.
    pub fn current(&self) -> DiskUsage {
        DiskUsage(self.usage.load(Ordering::Acquire))
    }

    /// The configured maximum.
    pub fn max(&self) -> DiskUsage {
        DiskUsage(self.max)
    }
}
