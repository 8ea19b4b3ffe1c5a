//! Full-chain audit by replay
//!
//! Re-derives the UTXO state from genesis on an ephemeral ledger and checks
//! every block's hash, linkage, proof-of-work, and transactions. Read-only
//! with respect to live state; failures carry the offending block index and
//! the specific reason.

use crate::core::block::{genesis_previous_hash, Block};
use crate::core::ledger::{validate_transaction, RejectReason, UtxoLedger};
use std::collections::HashSet;
use thiserror::Error;

/// What went wrong inside a single block during the audit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditFailure {
    #[error("Block index {found} does not match chain position {expected}")]
    IndexMismatch { expected: u64, found: u64 },
    #[error("Stored hash does not match recomputed hash")]
    HashMismatch,
    #[error("Previous-hash linkage broken: expected {expected}, found {found}")]
    ChainLinkage { expected: String, found: String },
    #[error("Proof of work does not meet difficulty target")]
    ProofOfWorkInvalid,
    #[error("Invalid transaction: {0}")]
    Transaction(RejectReason),
}

/// Audit outcome: the first failing block and why it failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Block {index}: {failure}")]
pub struct ChainAuditError {
    pub index: u64,
    pub failure: AuditFailure,
}

/// Replay the entire chain against a fresh UTXO view.
///
/// For each block in order: the stored index must equal the block's position
/// in the chain, the stored hash must equal the recomputed hash, the
/// previous-hash field must link to the prior block (the all-zero sentinel
/// for genesis), the hash must meet the proof-of-work target, and every
/// transaction must validate against the replay-local view. Transactions are
/// applied to the replay view sequentially within a block, mirroring how a
/// sealed block is committed, so a within-block double-spend surfaces as
/// `DoubleSpend` at the second transaction.
pub fn validate_chain(blocks: &[Block], difficulty: usize) -> Result<(), ChainAuditError> {
    let mut replay = UtxoLedger::new();
    let no_reserved: HashSet<_> = HashSet::new();

    for (i, block) in blocks.iter().enumerate() {
        let fail = |failure| ChainAuditError {
            index: i as u64,
            failure,
        };

        if block.index != i as u64 {
            return Err(fail(AuditFailure::IndexMismatch {
                expected: i as u64,
                found: block.index,
            }));
        }

        if block.hash != block.compute_hash() {
            return Err(fail(AuditFailure::HashMismatch));
        }

        let expected_prev = if i == 0 {
            genesis_previous_hash()
        } else {
            blocks[i - 1].hash.clone()
        };
        if block.previous_hash != expected_prev {
            return Err(fail(AuditFailure::ChainLinkage {
                expected: expected_prev,
                found: block.previous_hash.clone(),
            }));
        }

        if !block.is_valid_pow(difficulty) {
            return Err(fail(AuditFailure::ProofOfWorkInvalid));
        }

        for tx in &block.transactions {
            validate_transaction(tx, &replay, &no_reserved)
                .map_err(|reason| fail(AuditFailure::Transaction(reason)))?;
            replay.apply_transaction(tx);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::Transaction;

    const TEST_DIFFICULTY: usize = 2;

    fn mined_chain(len: usize) -> Vec<Block> {
        let mut blocks = vec![Block::genesis(TEST_DIFFICULTY)];
        for i in 1..len {
            let mut block = Block::new(i as u64, blocks[i - 1].hash.clone());
            block
                .transactions
                .push(Transaction::coinbase(&format!("miner{}", i), 50));
            block.mine(TEST_DIFFICULTY);
            blocks.push(block);
        }
        blocks
    }

    #[test]
    fn test_valid_chain_passes() {
        let blocks = mined_chain(3);
        assert!(validate_chain(&blocks, TEST_DIFFICULTY).is_ok());
    }

    #[test]
    fn test_tampered_stored_hash_reported_at_block() {
        let mut blocks = mined_chain(3);

        // Flip one character of block 1's stored hash.
        let mut hash: Vec<u8> = blocks[1].hash.clone().into_bytes();
        hash[10] = if hash[10] == b'a' { b'b' } else { b'a' };
        blocks[1].hash = String::from_utf8(hash).unwrap();

        let err = validate_chain(&blocks, TEST_DIFFICULTY).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.failure, AuditFailure::HashMismatch);
    }

    #[test]
    fn test_wrong_index_detected() {
        let mut blocks = mined_chain(3);

        // Self-consistent block (hash covers the bad index) at the wrong
        // position in the chain.
        blocks[1].index = 5;
        blocks[1].mine(TEST_DIFFICULTY);
        blocks[2].previous_hash = blocks[1].hash.clone();
        blocks[2].mine(TEST_DIFFICULTY);

        let err = validate_chain(&blocks, TEST_DIFFICULTY).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(
            err.failure,
            AuditFailure::IndexMismatch {
                expected: 1,
                found: 5
            }
        );
    }

    #[test]
    fn test_broken_linkage_detected() {
        let mut blocks = mined_chain(3);
        blocks[2].previous_hash = "f".repeat(64);
        blocks[2].mine(TEST_DIFFICULTY); // reseal so only linkage is wrong

        let err = validate_chain(&blocks, TEST_DIFFICULTY).unwrap_err();
        assert_eq!(err.index, 2);
        assert!(matches!(err.failure, AuditFailure::ChainLinkage { .. }));
    }

    #[test]
    fn test_insufficient_pow_detected() {
        let blocks = mined_chain(2);
        // Audit at a stricter target than the blocks were sealed under.
        let err = validate_chain(&blocks, 16).unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.failure, AuditFailure::ProofOfWorkInvalid);
    }

    #[test]
    fn test_unfunded_spend_detected_during_replay() {
        let mut blocks = mined_chain(2);

        let mut block = Block::new(2, blocks[1].hash.clone());
        let bogus = Transaction::new(
            vec![crate::core::transaction::TransactionInput {
                tx_hash: "e".repeat(64),
                output_index: 0,
            }],
            vec![crate::core::transaction::TransactionOutput {
                amount: 10,
                owner: "thief".to_string(),
            }],
        );
        block.transactions.push(bogus);
        block.mine(TEST_DIFFICULTY);
        blocks.push(block);

        let err = validate_chain(&blocks, TEST_DIFFICULTY).unwrap_err();
        assert_eq!(err.index, 2);
        assert!(matches!(
            err.failure,
            AuditFailure::Transaction(RejectReason::UnknownUtxo(_))
        ));
    }
}
