//! Mining: the pending-transaction pool and the proof-of-work driver.

pub mod mempool;
pub mod miner;

pub use mempool::Mempool;
pub use miner::{Miner, MiningStats};
