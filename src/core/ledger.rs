//! UTXO ledger: the authoritative unspent-output state
//!
//! Tracks the live `utxo_set` and the append-only `spent_set`. The same
//! ledger type backs both the committed state owned by the blockchain and
//! the ephemeral replay view used by the chain validator, so the validation
//! routine below is shared by mempool admission, block assembly, and audit.

use crate::core::block::Block;
use crate::core::transaction::{Transaction, Utxo, UtxoId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Why a transaction was rejected.
///
/// Rejection is an expected outcome, not a fault: these are returned as
/// values to the caller and never panic across the public API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Malformed transaction")]
    MalformedTransaction,
    #[error("Unknown UTXO: {0}")]
    UnknownUtxo(UtxoId),
    #[error("Ownership mismatch on input {0}")]
    OwnershipMismatch(UtxoId),
    #[error("Double spend of {0}")]
    DoubleSpend(UtxoId),
    #[error("Input {0} already claimed by a pending transaction")]
    DoubleSpendInPool(UtxoId),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Overdraft: outputs {outputs} exceed inputs {inputs}")]
    Overdraft { inputs: u64, outputs: u64 },
}

/// The unspent-output state: live outputs plus permanently spent identifiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UtxoLedger {
    /// Live spendable outputs keyed by identifier
    utxo_set: HashMap<UtxoId, Utxo>,
    /// Identifiers consumed by a committed transaction; append-only
    spent_set: HashSet<UtxoId>,
}

impl UtxoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live UTXO
    pub fn get(&self, id: &UtxoId) -> Option<&Utxo> {
        self.utxo_set.get(id)
    }

    /// Whether an identifier has been permanently spent
    pub fn is_spent(&self, id: &UtxoId) -> bool {
        self.spent_set.contains(id)
    }

    /// All live UTXOs owned by the given public key
    pub fn utxos_for(&self, owner: &str) -> Vec<Utxo> {
        self.utxo_set
            .values()
            .filter(|utxo| utxo.owner() == owner)
            .cloned()
            .collect()
    }

    /// Sum of live UTXO amounts owned by the given public key, saturating
    pub fn balance(&self, owner: &str) -> u64 {
        self.utxo_set
            .values()
            .filter(|utxo| utxo.owner() == owner)
            .fold(0u64, |sum, utxo| sum.saturating_add(utxo.amount()))
    }

    /// Number of live UTXOs
    pub fn len(&self) -> usize {
        self.utxo_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxo_set.is_empty()
    }

    /// Total value of all live UTXOs, saturating
    pub fn total_coins(&self) -> u64 {
        self.utxo_set
            .values()
            .fold(0u64, |sum, utxo| sum.saturating_add(utxo.amount()))
    }

    /// Apply a single transaction's effects: consume its inputs, then create
    /// its outputs keyed by `(tx_hash, index)`.
    pub fn apply_transaction(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            let id = input.utxo_id();
            self.utxo_set.remove(&id);
            self.spent_set.insert(id);
        }

        for (index, output) in tx.outputs.iter().enumerate() {
            let id = UtxoId::new(tx.hash.clone(), index as u32);
            self.utxo_set.insert(
                id.clone(),
                Utxo {
                    id,
                    output: output.clone(),
                },
            );
        }
    }

    /// Apply a sealed block exactly once, in transaction order.
    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.apply_transaction(tx);
        }
    }
}

/// Validate a transaction against a UTXO view.
///
/// `reserved` holds input identifiers provisionally claimed by transactions
/// that are not yet committed: the mempool's pending claims during admission,
/// or the in-progress block's spends during assembly. Pass an empty set for a
/// plain check against committed state.
///
/// A coinbase transaction (no inputs) is always valid at this layer; reward
/// correctness is the orchestrator's concern.
pub fn validate_transaction(
    tx: &Transaction,
    ledger: &UtxoLedger,
    reserved: &HashSet<UtxoId>,
) -> Result<(), RejectReason> {
    if tx.inputs.is_empty() && tx.outputs.is_empty() {
        return Err(RejectReason::MalformedTransaction);
    }

    if tx.is_coinbase() {
        return Ok(());
    }

    if tx.outputs.iter().any(|o| o.amount == 0) {
        return Err(RejectReason::MalformedTransaction);
    }

    // The owner of the first input's UTXO is the presumed sender.
    let Some(first) = tx.inputs.first() else {
        return Err(RejectReason::MalformedTransaction);
    };
    let first_id = first.utxo_id();
    let sender = match ledger.get(&first_id) {
        Some(utxo) => utxo.owner().to_string(),
        None if ledger.is_spent(&first_id) => {
            return Err(RejectReason::DoubleSpend(first_id));
        }
        None => return Err(RejectReason::UnknownUtxo(first_id)),
    };

    if !tx.verify(&sender) {
        return Err(RejectReason::InvalidSignature);
    }

    // Amounts are attacker-supplied; sums are taken in u128 so they can
    // neither panic nor wrap past the Overdraft comparison.
    let mut input_sum: u128 = 0;
    let mut seen: HashSet<UtxoId> = HashSet::new();

    for input in &tx.inputs {
        let id = input.utxo_id();

        if ledger.is_spent(&id) {
            return Err(RejectReason::DoubleSpend(id));
        }
        // The same output listed twice in one transaction is a double
        // spend of that output, pool or no pool.
        if !seen.insert(id.clone()) {
            return Err(RejectReason::DoubleSpend(id));
        }
        if reserved.contains(&id) {
            return Err(RejectReason::DoubleSpendInPool(id));
        }

        let Some(utxo) = ledger.get(&id) else {
            return Err(RejectReason::UnknownUtxo(id));
        };
        if utxo.owner() != sender {
            return Err(RejectReason::OwnershipMismatch(id));
        }

        input_sum += utxo.amount() as u128;
    }

    let output_sum: u128 = tx.outputs.iter().map(|o| o.amount as u128).sum();
    if output_sum > input_sum {
        return Err(RejectReason::Overdraft {
            inputs: u64::try_from(input_sum).unwrap_or(u64::MAX),
            outputs: u64::try_from(output_sum).unwrap_or(u64::MAX),
        });
    }

    Ok(())
}
