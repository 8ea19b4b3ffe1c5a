//! A single-process proof-of-work ledger built on the UTXO model.
//!
//! The crate is organized in layers:
//!
//! - [`crypto`]: SHA-256 hashing, secp256k1 keys and signatures, and the
//!   Merkle commitment over transaction hashes.
//! - [`core`]: transactions, blocks, the UTXO ledger, the chain validator,
//!   and the [`core::Blockchain`] aggregate that ties them together.
//! - [`mining`]: the pending-transaction pool and the proof-of-work driver.
//! - [`wallet`]: key ownership, coin selection, and transaction signing.
//! - [`sim`]: a threaded multi-user simulation harness with cooperative
//!   pause and shutdown.
//!
//! ```no_run
//! use utxo_chain::core::Blockchain;
//! use utxo_chain::wallet::Wallet;
//!
//! let mut chain = Blockchain::with_difficulty(2);
//! let alice = Wallet::new();
//! let bob = Wallet::new();
//!
//! chain.mine_next_block(&alice.public_key());
//! let tx = alice.create_transaction(&bob.public_key(), 10, &chain).unwrap();
//! chain.submit_transaction(tx).unwrap();
//! chain.mine_next_block(&bob.public_key());
//!
//! assert!(chain.is_chain_valid());
//! ```

pub mod core;
pub mod crypto;
pub mod mining;
pub mod sim;
pub mod wallet;

pub use crate::core::{Block, Blockchain, ChainConfig, RejectReason, Transaction};
pub use crate::mining::{Mempool, Miner, MiningStats};
pub use crate::wallet::Wallet;
