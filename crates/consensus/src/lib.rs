//! Proof of Work consensus for cryptochain.
//!
//! This crate provides:
//! - The nonce search against the keyed block hash
//! - A cancellable background worker with progress reporting
//! - Transaction validation (amount, signature)
//! - Block validation (merkle root, hash, parent link, difficulty)
//!
//! # Example
//!
//! ```rust
//! use cryptochain_consensus::{mine, BlockValidator};
//! use cryptochain_core::{merkle_root, Block, HmacSha256Hasher, Transaction};
//!
//! let hasher = HmacSha256Hasher::default();
//! let genesis = Block::genesis(&hasher);
//!
//! let txs = vec![Transaction::system(100, "04aa")];
//! let root = merkle_root(&txs);
//! let nonce = mine(&hasher, &genesis.hash, &root, 1, |_| {}).unwrap();
//! let block = Block::with_merkle_root(&hasher, 1, txs, genesis.hash.clone(), root, nonce);
//!
//! BlockValidator::new(&hasher, 1)
//!     .validate_chain(&[genesis, block])
//!     .unwrap();
//! ```

pub mod pow;
pub mod validator;
pub mod worker;

// Re-export commonly used types
pub use pow::{
    mine, search, CancelFlag, MiningJob, PowConfig, PowError, Solution,
    DEFAULT_PROGRESS_INTERVAL, MAX_DIFFICULTY,
};
pub use validator::{BlockValidator, TransactionValidator, ValidationError};
pub use worker::MiningWorker;
