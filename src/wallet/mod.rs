//! Wallets: key ownership and client-side transaction construction.

pub mod wallet;

pub use wallet::{Wallet, WalletError};
