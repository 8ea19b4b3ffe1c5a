//! Core ledger data structures: transactions, blocks, the UTXO set, the
//! chain validator, and the blockchain aggregate.

pub mod block;
pub mod blockchain;
pub mod ledger;
pub mod transaction;
pub mod validator;

pub use block::Block;
pub use blockchain::{Blockchain, ChainConfig, ChainStats};
pub use ledger::{validate_transaction, RejectReason, UtxoLedger};
pub use transaction::{Transaction, TransactionInput, TransactionOutput, Utxo, UtxoId};
pub use validator::{AuditFailure, ChainAuditError};
