//! Merkle commitment over an ordered list of transaction hashes
//!
//! Operates on hex-encoded hashes: each level concatenates adjacent hash
//! strings and hashes the result, duplicating the last element when a level
//! has odd length. The one-sided duplication bias is part of the commitment
//! scheme and must not be changed.

use super::hash::sha256_hex;

/// Calculate the Merkle root of an ordered sequence of hex-encoded hashes.
///
/// The empty sequence commits to the hash of the empty string. A single
/// hash is its own root.
pub fn merkle_root(tx_hashes: &[String]) -> String {
    if tx_hashes.is_empty() {
        return sha256_hex(b"");
    }

    let mut level: Vec<String> = tx_hashes.to_vec();

    while level.len() > 1 {
        if level.len() % 2 != 0 {
            let last = level
                .last()
                .cloned()
                .expect("non-empty level has a last element");
            level.push(last);
        }

        level = level
            .chunks(2)
            .map(|pair| sha256_hex(format!("{}{}", pair[0], pair[1]).as_bytes()))
            .collect();
    }

    level.remove(0)
}
