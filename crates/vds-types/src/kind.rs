use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::TypeError;

/// The closed set of data kinds a store understands.
///
/// Each kind carries its own put/delete/edit rules; the rules are looked up
/// at runtime by the engine rather than composed at the type level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataKind {
    /// Content-addressed, never edited.
    Immutable,
    /// Versioned data editable only by its owner.
    MutableOwned,
    /// Versioned data anyone may extend.
    Appendable,
    /// Signature-only data: a name and an owner, no editable payload.
    SignatureOnly,
}

impl DataKind {
    /// All kinds, in tag order.
    pub const ALL: [DataKind; 4] = [
        Self::Immutable,
        Self::MutableOwned,
        Self::Appendable,
        Self::SignatureOnly,
    ];

    /// Stable one-byte tag used when deriving storage keys.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Immutable => 0,
            Self::MutableOwned => 1,
            Self::Appendable => 2,
            Self::SignatureOnly => 3,
        }
    }

    /// Lower-case name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immutable => "immutable",
            Self::MutableOwned => "mutable-owned",
            Self::Appendable => "appendable",
            Self::SignatureOnly => "signature-only",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TypeError::UnknownKind(s.to_string()))
    }
}

/// Key of a version history: the data kind plus the data name.
///
/// Names are only unique within a kind. Two keys sharing the same `name`
/// bytes but different kinds address different histories.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataKey {
    pub kind: DataKind,
    pub name: Digest,
}

impl DataKey {
    pub fn new(kind: DataKind, name: Digest) -> Self {
        Self { kind, name }
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataKey({}:{})", self.kind, self.name.short_hex())
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name.short_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_distinct() {
        let mut tags: Vec<u8> = DataKind::ALL.iter().map(DataKind::tag).collect();
        tags.dedup();
        assert_eq!(tags.len(), DataKind::ALL.len());
    }

    #[test]
    fn parse_roundtrip() {
        for kind in DataKind::ALL {
            let parsed: DataKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn parse_unknown_kind() {
        assert_eq!(
            "directory".parse::<DataKind>(),
            Err(TypeError::UnknownKind("directory".into()))
        );
    }

    #[test]
    fn keys_with_same_name_differ_by_kind() {
        let name = Digest::from_hash([3; 32]);
        let a = DataKey::new(DataKind::MutableOwned, name);
        let b = DataKey::new(DataKind::Appendable, name);
        assert_ne!(a, b);
    }

    #[test]
    fn key_display() {
        let key = DataKey::new(DataKind::Appendable, Digest::from_hash([0xff; 32]));
        assert_eq!(key.to_string(), "appendable:ffffffff");
    }
}
