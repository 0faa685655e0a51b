use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::TypeError;

/// Name of one version in a version history.
///
/// `id` is the content hash of the version's payload; `index` strictly
/// increases along every root-to-tip path. Ordering is by `index` first,
/// then by `id`, so sorted collections list older versions first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionName {
    pub index: u64,
    pub id: Digest,
}

impl VersionName {
    pub fn new(index: u64, id: Digest) -> Self {
        Self { index, id }
    }
}

impl fmt::Debug for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}:{}", self.index, self.id.short_hex())
    }
}

impl fmt::Display for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.id)
    }
}

/// Parses the `Display` form, `<index>:<64 hex chars>`.
impl FromStr for VersionName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (index, id) = s
            .split_once(':')
            .ok_or_else(|| TypeError::InvalidVersionName(s.to_string()))?;
        let index = index
            .parse::<u64>()
            .map_err(|_| TypeError::InvalidVersionName(s.to_string()))?;
        Ok(Self::new(index, Digest::from_hex(id)?))
    }
}
