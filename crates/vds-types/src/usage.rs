use std::fmt;

use serde::{Deserialize, Serialize};

/// Aggregate byte count of stored data.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DiskUsage(pub u64);

impl DiskUsage {
    pub const ZERO: Self = Self(0);

    pub fn bytes(&self) -> u64 {
        self.0
    }

    pub fn saturating_add(self, bytes: u64) -> Self {
        Self(self.0.saturating_add(bytes))
    }

    pub fn saturating_sub(self, bytes: u64) -> Self {
        Self(self.0.saturating_sub(bytes))
    }
}

impl From<u64> for DiskUsage {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for DiskUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} B", self.0)
    }
}
