use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Width of every digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Fixed-width content hash.
///
/// A `Digest` names an immutable block (the hash of its bytes) and
/// identifies the payload of a version. The value itself carries no hashing
/// logic; see `vds-crypto` for how digests are computed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wrap a pre-computed hash.
    pub const fn from_hash(hash: [u8; DIGEST_LEN]) -> Self {
        Self(hash)
    }

    /// The null digest (all zeros). Never the name of a stored block.
    pub const fn null() -> Self {
        Self([0u8; DIGEST_LEN])
    }

    /// Returns `true` if this is the null digest.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; DIGEST_LEN]
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != DIGEST_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; DIGEST_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Digest> for [u8; DIGEST_LEN] {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_all_zeros() {
        let null = Digest::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; DIGEST_LEN]);
        assert!(!Digest::from_hash([1; 32]).is_null());
    }

    #[test]
    fn hex_roundtrip() {
        let d = Digest::from_hash([0xab; 32]);
        let parsed = Digest::from_hex(&d.to_hex()).unwrap();
        assert_eq!(d, parsed);
        let parsed: Digest = d.to_hex().parse().unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            Digest::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
        assert_eq!(
            Digest::from_hex("abcd"),
            Err(TypeError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }

    #[test]
    fn short_hex_is_8_chars() {
        let d = Digest::from_hash([7; 32]);
        assert_eq!(d.short_hex(), "07070707");
        assert_eq!(format!("{d:?}"), "Digest(07070707)");
    }

    #[test]
    fn display_is_full_hex() {
        let d = Digest::from_hash([1; 32]);
        let display = format!("{d}");
        assert_eq!(display.len(), 64);
        assert_eq!(display, d.to_hex());
    }

    #[test]
    fn serde_roundtrip() {
        let d = Digest::from_hash([9; 32]);
        let json = serde_json::to_string(&d).unwrap();
        let parsed: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn ordering_is_consistent() {
        let d1 = Digest::from_hash([0; 32]);
        let d2 = Digest::from_hash([1; 32]);
        assert!(d1 < d2);
    }
}
