//! Cryptographic utilities for the ledger engine
//!
//! This module provides:
//! - SHA-256 hashing and the proof-of-work target check
//! - ECDSA signing/verification (secp256k1)
//! - Merkle root calculation

pub mod hash;
pub mod keys;
pub mod merkle;

pub use hash::{meets_difficulty, sha256, sha256_hex};
pub use keys::{sign_message, verify_signature, KeyError, KeyPair};
pub use merkle::merkle_root;
