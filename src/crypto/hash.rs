//! SHA-256 hashing utilities
//!
//! Provides the hash primitives used for transaction identifiers, block
//! hashes, and the Merkle commitment, plus the proof-of-work target check.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks if a hex-encoded hash meets the difficulty target.
/// The first `difficulty` hex digits must all be '0'.
pub fn meets_difficulty(hash_hex: &str, difficulty: usize) -> bool {
    if hash_hex.len() < difficulty {
        return false;
    }
    hash_hex.bytes().take(difficulty).all(|b| b == b'0')
}
