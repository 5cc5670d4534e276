//! Ledger orchestration for cryptochain.
//!
//! This crate brings together all components to run a ledger:
//! - **Mempool**: pending transfers in submission order
//! - **Consensus**: proof-of-work sealing and chain validation
//! - **Wallets**: balance settlement once a block is committed
//!
//! # Example
//!
//! ```rust
//! use cryptochain_chain::{Blockchain, BlockchainConfig};
//! use cryptochain_core::{Decimal, Sender};
//!
//! let mut blockchain = Blockchain::new(BlockchainConfig::with_difficulty(2)).unwrap();
//!
//! // Funding is mined before create_wallet returns
//! let alice = blockchain.create_wallet("Alice", 100).unwrap();
//! let bob = blockchain.create_wallet("Bob", 0).unwrap();
//!
//! blockchain
//!     .create_transaction(
//!         Decimal::new(405, 1), // 40.5
//!         Sender::Wallet(alice.public_key.clone()),
//!         &bob.public_key,
//!         &alice.private_key,
//!     )
//!     .unwrap();
//! blockchain.mine().unwrap();
//!
//! assert_eq!(blockchain.wallet(&alice.public_key).unwrap().balance, Decimal::new(595, 1));
//! assert_eq!(blockchain.wallet(&bob.public_key).unwrap().balance, Decimal::new(405, 1));
//! assert!(blockchain.validate_chain().is_ok());
//! ```

pub mod blockchain;
pub mod config;
pub mod mempool;
pub mod shared;
pub mod wallets;

// Re-export commonly used types
pub use blockchain::{Blockchain, BlockchainError, BlockchainStats, PendingBlock};
pub use config::{BalancePolicy, BlockchainConfig, ConfigError, FundingMode};
pub use mempool::{Mempool, MempoolConfig, MempoolError};
pub use shared::{MiningSession, SharedBlockchain};
pub use wallets::WalletRegistry;
