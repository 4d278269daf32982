//! # Hashing Utilities
//!
//! Two hash functions, two jobs, no exceptions:
//!
//! - **SHA-256** — for externally verifiable hash locks. A counterparty on
//!   another system commits to `sha256(preimage)` and later reveals the
//!   preimage; we must agree with whatever they computed, so we use the hash
//!   function the rest of the world uses.
//! - **BLAKE3** — for everything Meridian-internal, always through
//!   `derive_key` domain separation so receipts from different contexts can
//!   never collide.
//!
//! [`ProofHash`] is the 32-byte fixed-length hash target carried by invoice
//! and escrow records. Constructing one from caller-supplied bytes goes
//! through [`ProofHash::from_slice`], which is where the length check the
//! engines rely on actually lives.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

use crate::config::HASH_LENGTH;

/// The supplied byte string was not exactly 32 bytes long.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hash length: expected {HASH_LENGTH} bytes, got {0}")]
pub struct HashLengthError(pub usize);

/// A 32-byte hash target used as a proof commitment.
///
/// Stored on invoices (the hash-lock a settlement preimage must match) and
/// escrows (the byte-exact release proof). Compared by exact equality only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofHash([u8; HASH_LENGTH]);

impl ProofHash {
    /// Wraps a raw 32-byte digest.
    pub fn from_bytes(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Validates the length of a caller-supplied byte string and wraps it.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashLengthError> {
        if bytes.len() != HASH_LENGTH {
            return Err(HashLengthError(bytes.len()));
        }
        let mut arr = [0u8; HASH_LENGTH];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Commits to a preimage: `ProofHash::sha256(p)` is the hash a later
    /// reveal of `p` must match.
    pub fn sha256(preimage: &[u8]) -> Self {
        Self(sha256(preimage))
    }

    /// Returns the raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// Returns the hex-encoded digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ProofHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofHash({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for ProofHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute the SHA-256 hash of the input data as a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute a domain-separated hash using BLAKE3 with a context string.
///
/// Uses BLAKE3's built-in `derive_key` mode, which mixes the context string
/// into the internal IV. Hashes produced under different contexts cannot
/// collide by construction, so a lock receipt can never be mistaken for any
/// other 32-byte value Meridian emits.
pub fn domain_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string — the canonical test vector.
        let hash = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn sha256_deterministic() {
        assert_eq!(sha256(b"meridian"), sha256(b"meridian"));
        assert_ne!(sha256(b"meridian"), sha256(b"Meridian"));
    }

    #[test]
    fn proof_hash_commits_to_preimage() {
        let commit = ProofHash::sha256(b"secret preimage");
        assert_eq!(commit.as_bytes(), &sha256(b"secret preimage"));
    }

    #[test]
    fn from_slice_enforces_length() {
        assert_eq!(ProofHash::from_slice(&[0u8; 31]), Err(HashLengthError(31)));
        assert_eq!(ProofHash::from_slice(&[0u8; 33]), Err(HashLengthError(33)));
        assert!(ProofHash::from_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn domain_separation_changes_output() {
        let data = b"same data";
        assert_ne!(domain_hash("context-a", data), domain_hash("context-b", data));
    }

    #[test]
    fn proof_hash_hex_roundtrip() {
        let hash = ProofHash::sha256(b"roundtrip");
        let json = serde_json::to_string(&hash).expect("serialize");
        let recovered: ProofHash = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(hash, recovered);
    }
}
