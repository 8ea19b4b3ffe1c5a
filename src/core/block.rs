//! Block: transaction batch sealed by proof-of-work
//!
//! The block hash covers `index || timestamp || merkle_root || previous_hash
//! || nonce`; the Merkle root is derived from the transaction list and never
//! set independently. Mutating any field leaves the cached hash stale until
//! the block is resealed.

use crate::core::ledger::{validate_transaction, RejectReason, UtxoLedger};
use crate::core::transaction::{Transaction, UtxoId};
use crate::crypto::{meets_difficulty, merkle_root, sha256_hex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How often the gated nonce search polls its control closure.
/// Coarse enough to keep throughput, fine enough to bound pause latency.
const POW_POLL_INTERVAL: u64 = 4096;

/// Previous-hash sentinel carried by the genesis block
pub fn genesis_previous_hash() -> String {
    "0".repeat(64)
}

/// A block in the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Block height, 0-based and monotonic
    pub index: u64,
    /// Block creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Hash of the previous block
    pub previous_hash: String,
    /// Nonce found by the proof-of-work search
    pub nonce: u64,
    /// Merkle commitment over the transaction list (derived)
    pub merkle_root: String,
    /// Block hash (cached; stale after any field mutation until resealed)
    pub hash: String,
    /// Ordered transaction list
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a new unmined block with an empty transaction list
    pub fn new(index: u64, previous_hash: String) -> Self {
        let mut block = Self {
            index,
            timestamp: Utc::now(),
            previous_hash,
            nonce: 0,
            merkle_root: String::new(),
            hash: String::new(),
            transactions: Vec::new(),
        };
        block.merkle_root = block.merkle_commitment();
        block.hash = block.compute_hash();
        block
    }

    /// Create and mine the genesis block: index 0, all-zero previous hash,
    /// empty transaction list, sealed like any other block.
    pub fn genesis(difficulty: usize) -> Self {
        let mut block = Self::new(0, genesis_previous_hash());
        block.mine(difficulty);
        block
    }

    /// Derive the Merkle commitment from the current transaction list,
    /// re-hashing each transaction's content.
    pub fn merkle_commitment(&self) -> String {
        let tx_hashes: Vec<String> = self
            .transactions
            .iter()
            .map(|tx| tx.compute_hash())
            .collect();
        merkle_root(&tx_hashes)
    }

    /// Recompute the block hash from current fields, deriving the Merkle root
    /// fresh from the transaction list.
    pub fn compute_hash(&self) -> String {
        let data = format!(
            "{}{}{}{}{}",
            self.index,
            self.timestamp.timestamp_micros(),
            self.merkle_commitment(),
            self.previous_hash,
            self.nonce
        );
        sha256_hex(data.as_bytes())
    }

    /// Re-derive the cached Merkle root and hash from current fields
    fn refresh(&mut self) {
        self.merkle_root = self.merkle_commitment();
        self.hash = self.compute_hash();
    }

    /// Attempt to add a transaction to the (unsealed) block.
    ///
    /// A coinbase is admitted unconditionally. Any other transaction must
    /// validate against `ledger` plus the `reserved` in-block spends; on
    /// success its inputs are added to `reserved`, the transaction is
    /// appended, and the block hash is recomputed. On failure the block is
    /// untouched and the transaction should be retried later.
    pub fn add_transaction(
        &mut self,
        tx: Transaction,
        ledger: &UtxoLedger,
        reserved: &mut HashSet<UtxoId>,
    ) -> Result<(), RejectReason> {
        if !tx.is_coinbase() {
            validate_transaction(&tx, ledger, reserved)?;
            for input in &tx.inputs {
                reserved.insert(input.utxo_id());
            }
        }
        self.transactions.push(tx);
        self.refresh();
        Ok(())
    }

    /// Seal the block: search the nonce space until the hash has `difficulty`
    /// leading zero hex digits. Blocking and CPU-bound; returns the number of
    /// attempts made.
    pub fn mine(&mut self, difficulty: usize) -> u64 {
        self.mine_while(difficulty, || true)
            .expect("unconditional nonce search cannot be interrupted")
    }

    /// Seal the block, polling `keep_going` every few thousand attempts.
    ///
    /// Returns `None` if the control closure asked to stop before a valid
    /// nonce was found; the block is then left unsealed and no state repair
    /// is needed. The closure may block internally (e.g. a pause gate).
    pub fn mine_while(
        &mut self,
        difficulty: usize,
        mut keep_going: impl FnMut() -> bool,
    ) -> Option<u64> {
        self.refresh();

        let mut attempts: u64 = 0;
        loop {
            if attempts % POW_POLL_INTERVAL == 0 && !keep_going() {
                return None;
            }
            if meets_difficulty(&self.hash, difficulty) {
                return Some(attempts);
            }
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.compute_hash();
            attempts += 1;
        }
    }

    /// Check that the cached hash meets the proof-of-work target
    pub fn is_valid_pow(&self, difficulty: usize) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    /// Check that the cached hash matches the recomputed one
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// The coinbase transaction, if the block carries one first
    pub fn coinbase_tx(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TransactionInput, TransactionOutput};
    use crate::crypto::KeyPair;

    const TEST_DIFFICULTY: usize = 2;

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(TEST_DIFFICULTY);
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0".repeat(64));
        assert!(genesis.transactions.is_empty());
        assert!(genesis.is_valid_pow(TEST_DIFFICULTY));
        assert!(genesis.verify_hash());
    }

    #[test]
    fn test_mined_hash_has_zero_prefix() {
        let mut block = Block::new(1, "0".repeat(64));
        block.mine(TEST_DIFFICULTY);
        assert!(block.hash.starts_with(&"0".repeat(TEST_DIFFICULTY)));
    }

    #[test]
    fn test_mutation_invalidates_cached_hash() {
        let mut block = Block::genesis(TEST_DIFFICULTY);
        assert!(block.verify_hash());

        block.nonce += 1;
        assert!(!block.verify_hash());

        let mut block = Block::genesis(TEST_DIFFICULTY);
        block
            .transactions
            .push(Transaction::coinbase("someone", 1));
        assert!(!block.verify_hash());
    }

    #[test]
    fn test_coinbase_admitted_unconditionally() {
        let ledger = UtxoLedger::new();
        let mut reserved = HashSet::new();
        let mut block = Block::new(1, "0".repeat(64));

        block
            .add_transaction(Transaction::coinbase("miner", 50), &ledger, &mut reserved)
            .unwrap();
        assert_eq!(block.tx_count(), 1);
        assert!(block.coinbase_tx().is_some());
    }

    #[test]
    fn test_invalid_transaction_leaves_block_untouched() {
        let ledger = UtxoLedger::new();
        let mut reserved = HashSet::new();
        let mut block = Block::new(1, "0".repeat(64));
        let hash_before = block.hash.clone();

        let tx = Transaction::new(
            vec![TransactionInput {
                tx_hash: "f".repeat(64),
                output_index: 0,
            }],
            vec![TransactionOutput {
                amount: 5,
                owner: "bob".to_string(),
            }],
        );
        assert!(block.add_transaction(tx, &ledger, &mut reserved).is_err());
        assert_eq!(block.tx_count(), 0);
        assert_eq!(block.hash, hash_before);
        assert!(reserved.is_empty());
    }

    #[test]
    fn test_in_block_reservation_blocks_second_spend() {
        let key_pair = KeyPair::generate();
        let sender = key_pair.public_key_hex();
        let mut ledger = UtxoLedger::new();
        let coinbase = Transaction::coinbase(&sender, 50);
        ledger.apply_transaction(&coinbase);

        let make_spend = |owner: &str| {
            let mut tx = Transaction::new(
                vec![TransactionInput {
                    tx_hash: coinbase.hash.clone(),
                    output_index: 0,
                }],
                vec![TransactionOutput {
                    amount: 50,
                    owner: owner.to_string(),
                }],
            );
            tx.sign(&key_pair).unwrap();
            tx
        };

        let mut reserved = HashSet::new();
        let mut block = Block::new(1, "0".repeat(64));
        block
            .add_transaction(make_spend("bob"), &ledger, &mut reserved)
            .unwrap();

        let second = block.add_transaction(make_spend("carol"), &ledger, &mut reserved);
        assert!(matches!(second, Err(RejectReason::DoubleSpendInPool(_))));
        assert_eq!(block.tx_count(), 1);
    }

    #[test]
    fn test_mine_while_aborts_on_control() {
        let mut block = Block::new(1, "0".repeat(64));
        // Impossible target plus an immediate stop: the search must abort.
        assert_eq!(block.mine_while(64, || false), None);
        assert!(!block.is_valid_pow(64));
    }
}
