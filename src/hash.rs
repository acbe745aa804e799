//! Hash primitives shared by the state journal and the notary.
//!
//! The state journal folds updates with the strictly-ordered
//! `H(prev || h)`; the notary instead uses an order-normalising `H(a, b)`
//! so proof verifiers never need to track left/right orientation. The two
//! are kept in separate functions rather than unified behind one trait
//! because their composition rules differ, not just their underlying
//! digest.

use crate::config::HashAlgorithm;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

/// A 32-byte digest.
pub type Digest32 = [u8; 32];

/// `H("")` under the given algorithm; the seed value for an empty state
/// digest or an empty notary.
pub fn empty_digest(algo: HashAlgorithm) -> Digest32 {
    digest(algo, &[])
}

/// Hash an arbitrary byte slice with the given algorithm.
pub fn digest(algo: HashAlgorithm, bytes: &[u8]) -> Digest32 {
    match algo {
        HashAlgorithm::Sha3_256 => {
            let mut hasher = Sha3_256::new();
            hasher.update(bytes);
            let out = hasher.finalize();
            let mut d = [0u8; 32];
            d.copy_from_slice(&out);
            d
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let out = hasher.finalize();
            let mut d = [0u8; 32];
            d.copy_from_slice(&out);
            d
        }
    }
}

/// Fold a log hash into the rolling state digest: `H(state_digest || log_hash)`.
///
/// This single-argument concatenation form is used everywhere the state
/// digest is advanced, including inside `rollback`'s verification step --
/// there is no two-argument variant in this codebase.
pub fn state_hash(algo: HashAlgorithm, state_digest: &Digest32, log_hash: &Digest32) -> Digest32 {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(state_digest);
    buf.extend_from_slice(log_hash);
    digest(algo, &buf)
}

/// The notary's order-normalising hash: `H(a, b) = H(b, a)` by sorting the
/// two arguments before concatenation. Always SHA-256, independent of
/// `JournalConfig` -- the notary is a standalone log.
pub fn notary_hash(a: &Digest32, b: &Digest32) -> Digest32 {
    let mut buf = Vec::with_capacity(64);
    if a > b {
        buf.extend_from_slice(a);
        buf.extend_from_slice(b);
    } else {
        buf.extend_from_slice(b);
        buf.extend_from_slice(a);
    }
    let mut hasher = Sha256::new();
    hasher.update(&buf);
    let out = hasher.finalize();
    let mut d = [0u8; 32];
    d.copy_from_slice(&out);
    d
}

/// `sha256(bytes)`, used by the notary for hashing caller-supplied data
/// before it enters the log.
pub fn notary_data_hash(bytes: &[u8]) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut d = [0u8; 32];
    d.copy_from_slice(&out);
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notary_hash_is_order_independent() {
        let a = notary_data_hash(b"a");
        let b = notary_data_hash(b"b");
        assert_eq!(notary_hash(&a, &b), notary_hash(&b, &a));
    }

    #[test]
    fn empty_digest_is_hash_of_empty_string() {
        assert_eq!(empty_digest(HashAlgorithm::Sha3_256), digest(HashAlgorithm::Sha3_256, &[]));
    }
}
