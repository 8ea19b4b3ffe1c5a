//! Pending-transaction pool
//!
//! FIFO staging area for transactions not yet sealed into a block. Admission
//! runs the shared ledger validation plus an in-pool claim check so two
//! pending transactions can never reference the same UTXO. No capacity bound
//! is imposed here; batch sizing happens at block assembly.

use crate::core::{validate_transaction, RejectReason, Transaction, UtxoId, UtxoLedger};
use std::collections::{HashSet, VecDeque};

/// Memory pool of pending transactions, in insertion order
#[derive(Debug, Default)]
pub struct Mempool {
    /// Pending transactions, oldest first
    pending: VecDeque<Transaction>,
    /// UTXO identifiers claimed as inputs by pending transactions
    claimed: HashSet<UtxoId>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a transaction against the ledger and the pool's claims, then
    /// admit it. A rejection leaves the pool unchanged.
    pub fn admit(&mut self, tx: Transaction, ledger: &UtxoLedger) -> Result<(), RejectReason> {
        validate_transaction(&tx, ledger, &self.claimed)?;

        for input in &tx.inputs {
            self.claimed.insert(input.utxo_id());
        }
        self.pending.push_back(tx);
        Ok(())
    }

    /// Remove and return up to `max` transactions from the front of the pool,
    /// releasing their input claims.
    pub fn take_batch(&mut self, max: usize) -> Vec<Transaction> {
        let count = max.min(self.pending.len());
        let batch: Vec<Transaction> = self.pending.drain(..count).collect();
        for tx in &batch {
            for input in &tx.inputs {
                self.claimed.remove(&input.utxo_id());
            }
        }
        batch
    }

    /// Put transactions back at the front of the pool in the given order,
    /// ahead of anything not yet attempted, restoring their input claims.
    /// Used for block-assembly candidates that failed or were aborted; they
    /// were already validated at admission.
    pub fn requeue_front(&mut self, txs: Vec<Transaction>) {
        for tx in txs.into_iter().rev() {
            for input in &tx.inputs {
                self.claimed.insert(input.utxo_id());
            }
            self.pending.push_front(tx);
        }
    }

    /// Drop pending transactions that reference a permanently spent UTXO;
    /// they can never become valid again. Returns how many were dropped.
    pub fn purge_spent(&mut self, ledger: &UtxoLedger) -> usize {
        let mut dropped = 0;
        self.pending.retain(|tx| {
            let dead = tx.inputs.iter().any(|input| ledger.is_spent(&input.utxo_id()));
            if dead {
                log::debug!("dropping permanently invalid pending transaction {}", tx.hash);
                dropped += 1;
            }
            !dead
        });
        if dropped > 0 {
            self.rebuild_claims();
        }
        dropped
    }

    fn rebuild_claims(&mut self) {
        self.claimed = self
            .pending
            .iter()
            .flat_map(|tx| tx.inputs.iter().map(|input| input.utxo_id()))
            .collect();
    }

    /// Pending transactions in insertion order
    pub fn pending(&self) -> impl Iterator<Item = &Transaction> {
        self.pending.iter()
    }

    /// Whether a pending transaction already claims this UTXO
    pub fn is_claimed(&self, id: &UtxoId) -> bool {
        self.claimed.contains(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
