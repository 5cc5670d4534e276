//! Core ledger primitives for cryptochain.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - Decimal amounts and their JSON encoding
//! - Cryptographic primitives (secp256k1 keypairs, signing, verification)
//! - The keyed block hash
//! - Transactions and the system sender
//! - Blocks
//! - Merkle commitments
//! - Wallets

pub mod amount;
pub mod block;
pub mod crypto;
pub mod hash;
pub mod merkle;
pub mod transaction;
pub mod wallet;

// Re-export commonly used types at the crate root
pub use amount::{format_amount, parse_amount, Decimal};
pub use block::{compute_block_hash, meets_difficulty, Block, GENESIS_PREV_HASH};
pub use crypto::{generate_keypair, CryptoContext, CryptoError, Keypair, PublicKey, Signature};
pub use hash::{sha256, BlockHasher, Hash, HmacSha256Hasher, Sha256Hasher, DEFAULT_HASH_KEY};
pub use merkle::{merkle_root, merkle_root_with, verify_proof, MerkleProof, MerkleTree, EMPTY_ROOT};
pub use transaction::{Sender, Transaction, TransactionError, SYSTEM_SENDER};
pub use wallet::Wallet;
