//! Parent-hash functions and leaf encoding helpers.
//!
//! The engine treats hashing as opaque: anything `Fn(&[u8], &[u8]) -> Vec<u8>`
//! works. The helpers here cover the two digests used across the workspace.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Plain function-pointer form of a parent hash.
pub type HashFn = fn(&[u8], &[u8]) -> Vec<u8>;

/// SHA-256 over `left ‖ right`.
#[must_use]
pub fn sha256_parent(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut h = Sha256::new();
    h.update(left);
    h.update(right);
    h.finalize().to_vec()
}

/// BLAKE3 over `left ‖ right`.
#[must_use]
pub fn blake3_parent(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut h = blake3::Hasher::new();
    h.update(left);
    h.update(right);
    h.finalize().as_bytes().to_vec()
}

/// Named parent-hash choice, recorded in proof bundles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    /// [`sha256_parent`].
    #[default]
    Sha256,
    /// [`blake3_parent`].
    Blake3,
}

impl HashKind {
    /// The parent function for this kind.
    #[inline]
    #[must_use]
    pub fn parent_fn(self) -> HashFn {
        match self {
            Self::Sha256 => sha256_parent,
            Self::Blake3 => blake3_parent,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

/// Encode an integer as an 8-byte little-endian leaf.
#[inline]
#[must_use]
pub fn leaf_from_u64(i: u64) -> Vec<u8> {
    i.to_le_bytes().to_vec()
}

/// Decode a hex leaf, tolerating an optional `0x` prefix and surrounding space.
pub fn leaf_from_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.trim();
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_parent_matches_reference_pair() {
        // Leaves 0 and 1 of the reference 8-leaf tree.
        let p = sha256_parent(&leaf_from_u64(0), &leaf_from_u64(1));
        assert_eq!(
            hex::encode(p),
            "9d34149fbd1fe777eb238799054c8cbfbce372255f219f8740838def9bfd02db"
        );
    }

    #[test]
    fn parent_is_order_sensitive() {
        for kind in [HashKind::Sha256, HashKind::Blake3] {
            let f = kind.parent_fn();
            assert_ne!(f(b"a", b"b"), f(b"b", b"a"), "{}", kind.as_str());
            assert_eq!(f(b"a", b"b").len(), 32);
        }
    }

    #[test]
    fn hex_leaves_accept_prefix() {
        assert_eq!(leaf_from_hex(" 0x0a0b\n").unwrap(), vec![10, 11]);
        assert!(leaf_from_hex("zz").is_err());
    }
}
