//! Miner
//!
//! Thin wrapper that drives block assembly on behalf of a reward address
//! and reports timing statistics for the proof-of-work search.

use crate::core::{Block, Blockchain};
use std::time::Instant;

/// Statistics from a single successful mining run
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Nonce values tried before the target was met
    pub hash_attempts: u64,
    /// Wall-clock duration of the search in milliseconds
    pub time_ms: u128,
    /// Attempts per second
    pub hash_rate: f64,
}

/// A miner identified by the public key its rewards are paid to
#[derive(Debug, Clone)]
pub struct Miner {
    /// Reward address (public key hex)
    pub address: String,
}

impl Miner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Mine the next block, blocking until the target is met
    pub fn mine(&self, chain: &mut Blockchain) -> (Block, MiningStats) {
        self.mine_while(chain, || true)
            .expect("unconditional mining cannot be interrupted")
    }

    /// Mine the next block, polling `keep_going` during the nonce search.
    ///
    /// Returns `None` if the control closure stopped the search; the chain
    /// is unchanged in that case.
    pub fn mine_while(
        &self,
        chain: &mut Blockchain,
        keep_going: impl FnMut() -> bool,
    ) -> Option<(Block, MiningStats)> {
        let start = Instant::now();
        let (block, hash_attempts) = chain.mine_next_block_while(&self.address, keep_going)?;
        let elapsed = start.elapsed();

        let time_ms = elapsed.as_millis();
        let hash_rate = if elapsed.as_secs_f64() > 0.0 {
            hash_attempts as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        log::info!(
            "Mined block {} in {}ms ({:.0} H/s)",
            block.index,
            time_ms,
            hash_rate
        );

        Some((
            block,
            MiningStats {
                hash_attempts,
                time_ms,
                hash_rate,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miner_extends_chain_and_reports_stats() {
        let mut chain = Blockchain::with_difficulty(2);
        let miner = Miner::new("miner_pubkey");

        let (block, stats) = miner.mine(&mut chain);

        assert_eq!(block.index, 1);
        assert_eq!(chain.height(), 1);
        assert!(stats.hash_attempts >= 1);
        assert_eq!(chain.balance("miner_pubkey"), chain.config.base_reward);
    }

    #[test]
    fn test_interrupted_miner_leaves_chain_unchanged() {
        let mut chain = Blockchain::with_difficulty(2);
        let miner = Miner::new("miner_pubkey");

        assert!(miner.mine_while(&mut chain, || false).is_none());
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.balance("miner_pubkey"), 0);
    }
}
