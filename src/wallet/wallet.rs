//! Wallet
//!
//! Key ownership plus the client-side half of the transaction protocol:
//! coin selection over the owner's live UTXOs, change calculation, and
//! signing.

use crate::core::{
    Blockchain, Transaction, TransactionInput, TransactionOutput, Utxo,
};
use crate::core::transaction::TransactionError;
use crate::crypto::keys::KeyPair;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// A keypair with an optional human-readable label
#[derive(Debug)]
pub struct Wallet {
    key_pair: KeyPair,
    /// Display name for logs and reports; not part of the protocol
    pub label: Option<String>,
}

impl Wallet {
    /// Create a wallet with a freshly generated keypair
    pub fn new() -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: None,
        }
    }

    /// Create a labelled wallet
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: Some(label.into()),
        }
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// The wallet's address: its public key as hex
    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    /// Sum of this wallet's live UTXOs
    pub fn balance(&self, chain: &Blockchain) -> u64 {
        chain.balance(&self.public_key())
    }

    /// This wallet's live UTXOs
    pub fn utxos(&self, chain: &Blockchain) -> Vec<Utxo> {
        chain.utxos_for(&self.public_key())
    }

    /// Build and sign a transfer of `amount` to `recipient`.
    ///
    /// Selects this wallet's UTXOs until the amount is covered and pays
    /// any excess back to this wallet as a change output. The transaction
    /// is signed but not submitted.
    pub fn create_transaction(
        &self,
        recipient: &str,
        amount: u64,
        chain: &Blockchain,
    ) -> Result<Transaction, WalletError> {
        let utxos = self.utxos(chain);
        let have: u64 = utxos.iter().map(|u| u.amount()).sum();
        if have < amount {
            return Err(WalletError::InsufficientFunds { have, need: amount });
        }

        let mut inputs = Vec::new();
        let mut gathered: u64 = 0;
        for utxo in utxos {
            if gathered >= amount {
                break;
            }
            gathered += utxo.amount();
            inputs.push(TransactionInput {
                tx_hash: utxo.id.tx_hash.clone(),
                output_index: utxo.id.output_index,
            });
        }

        let mut outputs = vec![TransactionOutput {
            amount,
            owner: recipient.to_string(),
        }];
        let change = gathered - amount;
        if change > 0 {
            outputs.push(TransactionOutput {
                amount: change,
                owner: self.public_key(),
            });
        }

        let mut tx = Transaction::new(inputs, outputs);
        tx.sign(&self.key_pair)?;
        Ok(tx)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}
