//! Blockchain orchestrator
//!
//! Owns the chain, the mempool, and the UTXO ledger, and composes them:
//! transaction submission, block assembly and sealing, ledger application,
//! and full-chain audit. Callers that share a `Blockchain` across workers
//! must guard the whole aggregate behind one lock so chain, pool, and ledger
//! mutations stay serialized.

use crate::core::block::Block;
use crate::core::ledger::{RejectReason, UtxoLedger};
use crate::core::transaction::{Transaction, Utxo};
use crate::core::validator::{self, ChainAuditError};
use crate::mining::Mempool;
use std::collections::HashSet;

/// Default mining difficulty (leading zero hex digits)
pub const DEFAULT_DIFFICULTY: usize = 3;

/// Base block reward in coins
pub const BASE_REWARD: u64 = 50;

/// Number of blocks between reward halvings
pub const HALVING_INTERVAL: u64 = 210_000;

/// Maximum non-coinbase transactions selected per block
pub const MAX_BLOCK_TXS: usize = 10;

/// Chain parameters, fixed at construction
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Proof-of-work target: leading zero hex digits required
    pub difficulty: usize,
    /// Reward for the first halving epoch
    pub base_reward: u64,
    /// Blocks per halving epoch
    pub halving_interval: u64,
    /// Mempool transactions attempted per block
    pub max_block_txs: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            base_reward: BASE_REWARD,
            halving_interval: HALVING_INTERVAL,
            max_block_txs: MAX_BLOCK_TXS,
        }
    }
}

/// Chain statistics snapshot for reporting
#[derive(Debug, Clone)]
pub struct ChainStats {
    pub height: u64,
    pub total_blocks: u64,
    pub total_transactions: u64,
    pub pending_transactions: usize,
    pub total_coins: u64,
    pub difficulty: usize,
    pub latest_hash: String,
}

/// The ledger engine: one linear chain, its pool, and its UTXO state
#[derive(Debug)]
pub struct Blockchain {
    /// The chain of blocks, genesis first; append-only
    pub chain: Vec<Block>,
    /// Pending transactions awaiting a block
    pub mempool: Mempool,
    /// Committed unspent-output state
    pub ledger: UtxoLedger,
    /// Chain parameters
    pub config: ChainConfig,
}

impl Blockchain {
    /// Create a new chain with a mined genesis block
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default())
    }

    /// Create a new chain with custom difficulty
    pub fn with_difficulty(difficulty: usize) -> Self {
        Self::with_config(ChainConfig {
            difficulty,
            ..ChainConfig::default()
        })
    }

    /// Create a new chain with full custom parameters
    pub fn with_config(config: ChainConfig) -> Self {
        let genesis = Block::genesis(config.difficulty);
        let mut ledger = UtxoLedger::new();
        ledger.apply_block(&genesis);

        Self {
            chain: vec![genesis],
            mempool: Mempool::new(),
            ledger,
            config,
        }
    }

    /// The most recent block
    pub fn latest_block(&self) -> &Block {
        self.chain
            .last()
            .expect("chain always holds at least the genesis block")
    }

    /// Get a block by index
    pub fn get_block(&self, index: u64) -> Option<&Block> {
        self.chain.get(index as usize)
    }

    /// Chain height (index of the latest block)
    pub fn height(&self) -> u64 {
        self.chain.len() as u64 - 1
    }

    /// Current mining reward, halving every `halving_interval` blocks
    pub fn current_reward(&self) -> u64 {
        let halvings = self.chain.len() as u64 / self.config.halving_interval;
        if halvings >= u64::BITS as u64 {
            // Deep enough halvings floor to zero; a domain limit, not an error.
            0
        } else {
            self.config.base_reward >> halvings
        }
    }

    /// Submit a signed transaction to the mempool
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), RejectReason> {
        self.mempool.admit(tx, &self.ledger)
    }

    /// Assemble, seal, and commit the next block, crediting `miner`.
    ///
    /// Blocking for the duration of the proof-of-work search; callers that
    /// need a shutdown-responsive variant should use
    /// [`Blockchain::mine_next_block_while`].
    pub fn mine_next_block(&mut self, miner: &str) -> Block {
        self.mine_next_block_while(miner, || true)
            .map(|(block, _)| block)
            .expect("unconditional mining cannot be interrupted")
    }

    /// Assemble, seal, and commit the next block, polling `keep_going`
    /// during the nonce search.
    ///
    /// Candidate transactions that fail validation against the current
    /// ledger (plus in-block spends) go back to the front of the pool, in
    /// their original relative order, for a later attempt. If the control
    /// closure stops the search, every candidate is returned to the pool and
    /// `None` comes back with no state changed.
    ///
    /// Returns the committed block and the number of nonce attempts.
    pub fn mine_next_block_while(
        &mut self,
        miner: &str,
        keep_going: impl FnMut() -> bool,
    ) -> Option<(Block, u64)> {
        let reward = self.current_reward();
        let mut block = Block::new(self.chain.len() as u64, self.latest_block().hash.clone());

        // In-block spends are provisionally consumed the moment a candidate
        // is admitted, so later candidates see them as claimed.
        let mut reserved = HashSet::new();

        block
            .add_transaction(Transaction::coinbase(miner, reward), &self.ledger, &mut reserved)
            .expect("a coinbase is admitted unconditionally");

        let candidates = self.mempool.take_batch(self.config.max_block_txs);
        let mut deferred = Vec::new();
        for tx in candidates.iter() {
            if let Err(reason) = block.add_transaction(tx.clone(), &self.ledger, &mut reserved) {
                log::debug!("transaction {} deferred from block {}: {}", tx.hash, block.index, reason);
                deferred.push(tx.clone());
            }
        }

        let attempts = match block.mine_while(self.config.difficulty, keep_going) {
            Some(attempts) => attempts,
            None => {
                // Aborted mid-search: restore every candidate, front of pool.
                self.mempool.requeue_front(candidates);
                return None;
            }
        };

        self.ledger.apply_block(&block);
        self.chain.push(block.clone());
        self.mempool.requeue_front(deferred);
        let purged = self.mempool.purge_spent(&self.ledger);
        if purged > 0 {
            log::debug!("purged {} dead transactions from mempool", purged);
        }

        log::info!(
            "Block {} sealed: {} transactions, reward {}, nonce {} ({} attempts)",
            block.index,
            block.tx_count(),
            reward,
            block.nonce,
            attempts
        );

        Some((block, attempts))
    }

    /// Replay the whole chain on an ephemeral UTXO view and certify it
    pub fn validate_chain(&self) -> Result<(), ChainAuditError> {
        validator::validate_chain(&self.chain, self.config.difficulty)
    }

    /// True when the full-chain audit passes
    pub fn is_chain_valid(&self) -> bool {
        match self.validate_chain() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("chain audit failed: {}", err);
                false
            }
        }
    }

    /// Live UTXOs owned by the given public key
    pub fn utxos_for(&self, owner: &str) -> Vec<Utxo> {
        self.ledger.utxos_for(owner)
    }

    /// Balance of the given public key
    pub fn balance(&self, owner: &str) -> u64 {
        self.ledger.balance(owner)
    }

    /// Snapshot of chain statistics for reporting
    pub fn stats(&self) -> ChainStats {
        let total_transactions: usize = self.chain.iter().map(|b| b.tx_count()).sum();
        ChainStats {
            height: self.height(),
            total_blocks: self.chain.len() as u64,
            total_transactions: total_transactions as u64,
            pending_transactions: self.mempool.len(),
            total_coins: self.ledger.total_coins(),
            difficulty: self.config.difficulty,
            latest_hash: self.latest_block().hash.clone(),
        }
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::AuditFailure;
    use crate::wallet::Wallet;

    fn test_chain() -> Blockchain {
        Blockchain::with_config(ChainConfig {
            difficulty: 2,
            base_reward: 50,
            halving_interval: 10,
            max_block_txs: 10,
        })
    }

    #[test]
    fn test_new_chain_starts_at_genesis() {
        let chain = test_chain();
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.latest_block().index, 0);
        assert!(chain.is_chain_valid());
    }

    #[test]
    fn test_mine_credits_reward() {
        let mut chain = test_chain();
        let block = chain.mine_next_block("miner_pubkey");

        assert_eq!(block.index, 1);
        assert!(block.is_valid_pow(2));
        assert_eq!(chain.balance("miner_pubkey"), 50);
        assert!(chain.is_chain_valid());
    }

    #[test]
    fn test_reward_halves_at_interval() {
        let mut chain = test_chain();
        // Genesis already counts toward the interval of 10.
        assert_eq!(chain.current_reward(), 50);
        for _ in 0..9 {
            chain.mine_next_block("miner_pubkey");
        }
        assert_eq!(chain.chain.len() as u64, 10);
        assert_eq!(chain.current_reward(), 25);
    }

    #[test]
    fn test_transfer_round_trip() {
        let mut chain = test_chain();
        let alice = Wallet::new();
        let bob = Wallet::new();
        let carol = Wallet::new();

        // Block 1 rewards Alice with 50.
        chain.mine_next_block(&alice.public_key());
        let reward = chain.balance(&alice.public_key());
        assert_eq!(reward, 50);

        // Alice sends half to Bob; Carol mines block 2.
        let tx = alice
            .create_transaction(&bob.public_key(), reward / 2, &chain)
            .unwrap();
        chain.submit_transaction(tx).unwrap();
        chain.mine_next_block(&carol.public_key());

        assert_eq!(chain.balance(&alice.public_key()), reward / 2);
        assert_eq!(chain.balance(&bob.public_key()), reward / 2);
        assert_eq!(chain.balance(&carol.public_key()), chain.current_reward());
        assert!(chain.is_chain_valid());
    }

    #[test]
    fn test_double_spend_rejected_pending_then_committed() {
        let mut chain = test_chain();
        let alice = Wallet::new();
        let bob = Wallet::new();

        chain.mine_next_block(&alice.public_key());

        let t1 = alice.create_transaction(&bob.public_key(), 50, &chain).unwrap();
        let t2 = alice.create_transaction(&bob.public_key(), 50, &chain).unwrap();

        chain.submit_transaction(t1).unwrap();
        // Same UTXO still pending in the pool.
        assert!(matches!(
            chain.submit_transaction(t2.clone()),
            Err(RejectReason::DoubleSpendInPool(_))
        ));

        chain.mine_next_block(&alice.public_key());
        // Now permanently spent in the ledger.
        assert!(matches!(
            chain.submit_transaction(t2),
            Err(RejectReason::DoubleSpend(_))
        ));
    }

    #[test]
    fn test_unfunded_spend_rejected_at_submission() {
        let mut chain = test_chain();
        let alice = Wallet::new();
        let bob = Wallet::new();

        chain.mine_next_block(&alice.public_key());

        // t2 spends an output that will only exist once t1 commits; the
        // mempool validates against the current ledger, so it is rejected.
        let t1 = alice.create_transaction(&bob.public_key(), 50, &chain).unwrap();
        let t2 = {
            let mut tx = Transaction::new(
                vec![crate::core::TransactionInput {
                    tx_hash: t1.hash.clone(),
                    output_index: 0,
                }],
                vec![crate::core::TransactionOutput {
                    amount: 50,
                    owner: alice.public_key(),
                }],
            );
            tx.sign(bob.key_pair()).unwrap();
            tx
        };

        chain.submit_transaction(t1).unwrap();
        assert!(matches!(
            chain.submit_transaction(t2),
            Err(RejectReason::UnknownUtxo(_))
        ));

        chain.mine_next_block(&alice.public_key());
        assert!(chain.mempool.is_empty());
        assert!(chain.is_chain_valid());
    }

    #[test]
    fn test_tampered_block_hash_fails_audit() {
        let mut chain = test_chain();
        chain.mine_next_block("miner_pubkey");
        chain.mine_next_block("miner_pubkey");

        let mut hash: Vec<u8> = chain.chain[1].hash.clone().into_bytes();
        hash[5] = if hash[5] == b'0' { b'1' } else { b'0' };
        chain.chain[1].hash = String::from_utf8(hash).unwrap();

        let err = chain.validate_chain().unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.failure, AuditFailure::HashMismatch);
        assert!(!chain.is_chain_valid());
    }

    #[test]
    fn test_conservation_for_committed_transfers() {
        let mut chain = test_chain();
        let alice = Wallet::new();
        let bob = Wallet::new();

        chain.mine_next_block(&alice.public_key());
        let tx = alice.create_transaction(&bob.public_key(), 20, &chain).unwrap();
        chain.submit_transaction(tx).unwrap();
        chain.mine_next_block(&bob.public_key());

        for block in &chain.chain {
            for tx in block.transactions.iter().filter(|t| !t.is_coinbase()) {
                // Inputs were resolvable when committed; conservation means
                // outputs never exceed what the inputs carried.
                assert!(tx.total_output() <= 50);
            }
        }
        assert!(chain.is_chain_valid());
    }
}
