//! UTXO-based transaction model
//!
//! A transaction consumes previously committed outputs (by reference) and
//! creates new ones. Its content hash covers inputs, outputs, and timestamp
//! but never the signature, so the hash is stable from construction through
//! signing. A transaction with no inputs is a coinbase (mining reward) and
//! carries no signature.

use crate::crypto::{sha256_hex, verify_signature, KeyError, KeyPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Signing error: {0}")]
    Signing(#[from] KeyError),
}

/// Identifier of a spendable output: the originating transaction hash plus
/// the output's position within it. Globally unique barring hash collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtxoId {
    pub tx_hash: String,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(tx_hash: impl Into<String>, output_index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            output_index,
        }
    }
}

impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.output_index)
    }
}

/// Transaction input (reference to a previous output)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Hash of the transaction that created the output being spent
    pub tx_hash: String,
    /// Index of the output in that transaction
    pub output_index: u32,
}

impl TransactionInput {
    /// The identifier of the UTXO this input claims
    pub fn utxo_id(&self) -> UtxoId {
        UtxoId::new(self.tx_hash.clone(), self.output_index)
    }
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    /// Amount of coins
    pub amount: u64,
    /// Owner's public key (hex-encoded, compressed)
    pub owner: String,
}

/// Unspent Transaction Output (UTXO)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utxo {
    pub id: UtxoId,
    pub output: TransactionOutput,
}

impl Utxo {
    pub fn amount(&self) -> u64 {
        self.output.amount
    }

    pub fn owner(&self) -> &str {
        &self.output.owner
    }
}

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Content hash (cached; recomputed at security-sensitive checks)
    pub hash: String,
    /// Outputs being consumed
    pub inputs: Vec<TransactionInput>,
    /// Outputs being created
    pub outputs: Vec<TransactionOutput>,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Sender's signature over the content hash, absent until signed
    pub signature: Option<String>,
}

impl Transaction {
    /// Create a new unsigned transaction
    pub fn new(inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>) -> Self {
        let mut tx = Self {
            hash: String::new(),
            inputs,
            outputs,
            timestamp: Utc::now(),
            signature: None,
        };
        tx.hash = tx.compute_hash();
        tx
    }

    /// Create a coinbase (mining reward) transaction: no inputs, no signature
    pub fn coinbase(owner: &str, amount: u64) -> Self {
        Self::new(
            vec![],
            vec![TransactionOutput {
                amount,
                owner: owner.to_string(),
            }],
        )
    }

    /// Whether this is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Compute the content hash over inputs, outputs, and timestamp.
    ///
    /// The serialization is canonical: fields appear in a fixed order with a
    /// fixed delimiter format, so equal-content transactions always hash
    /// identically. The signature is deliberately excluded.
    pub fn compute_hash(&self) -> String {
        let mut data = String::new();
        for input in &self.inputs {
            data.push_str(&format!("{}:{};", input.tx_hash, input.output_index));
        }
        data.push('|');
        for output in &self.outputs {
            data.push_str(&format!("{}:{};", output.owner, output.amount));
        }
        data.push('|');
        data.push_str(&self.timestamp.timestamp_micros().to_string());
        sha256_hex(data.as_bytes())
    }

    /// Sign the content hash with the given key pair
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        // Sign the raw 32-byte digest, recomputed from current content.
        let digest = hex::decode(self.compute_hash())
            .map_err(|_| TransactionError::Signing(KeyError::InvalidDigest))?;
        let signature = key_pair.sign(&digest)?;
        self.signature = Some(hex::encode(signature));
        Ok(())
    }

    /// Verify the signature against the given public key.
    ///
    /// Pure predicate: returns false when the signature is absent, the key is
    /// malformed, or cryptographic verification fails. The signed message is
    /// the recomputed content hash, so post-signing mutation is detected even
    /// if the cached hash was left stale.
    pub fn verify(&self, public_key_hex: &str) -> bool {
        let Some(signature_hex) = &self.signature else {
            return false;
        };
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(digest) = hex::decode(self.compute_hash()) else {
            return false;
        };
        verify_signature(public_key_hex, &digest, &signature)
    }

    /// Sum of output amounts, saturating: amounts are caller-supplied and
    /// must not be able to panic an accessor.
    pub fn total_output(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |sum, o| sum.saturating_add(o.amount))
    }
}
