//! Hash-linked blocks.

use crate::hash::BlockHasher;
use crate::merkle::{merkle_root_with, EMPTY_ROOT};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// `prev_hash` of the genesis block.
pub const GENESIS_PREV_HASH: &str = "0";

/// Input to the block hash: `prev_hash ++ nonce ++ merkle_root`, nonce in decimal.
pub fn block_hash_input(prev_hash: &str, nonce: u64, merkle_root: &str) -> String {
    format!("{prev_hash}{nonce}{merkle_root}")
}

/// Compute a block hash as lowercase hex.
pub fn compute_block_hash(
    hasher: &dyn BlockHasher,
    prev_hash: &str,
    nonce: u64,
    merkle_root: &str,
) -> String {
    hasher.digest_hex(&block_hash_input(prev_hash, nonce, merkle_root))
}

/// Get the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A committed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Committed transactions, in order.
    pub transactions: Vec<Transaction>,
    /// Hash of the previous block.
    pub prev_hash: String,
    /// Merkle root of `transactions`.
    pub merkle_root: String,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// `H(prev_hash ++ nonce ++ merkle_root)`.
    pub hash: String,
}

impl Block {
    /// Assemble a block, computing its merkle root and hash.
    pub fn new(
        hasher: &dyn BlockHasher,
        index: u64,
        transactions: Vec<Transaction>,
        prev_hash: impl Into<String>,
        nonce: u64,
    ) -> Self {
        let merkle_root = merkle_root_with(hasher, &transactions);
        Self::with_merkle_root(hasher, index, transactions, prev_hash, merkle_root, nonce)
    }

    /// Assemble a block from a merkle root computed ahead of mining.
    pub fn with_merkle_root(
        hasher: &dyn BlockHasher,
        index: u64,
        transactions: Vec<Transaction>,
        prev_hash: impl Into<String>,
        merkle_root: String,
        nonce: u64,
    ) -> Self {
        let prev_hash = prev_hash.into();
        let hash = compute_block_hash(hasher, &prev_hash, nonce, &merkle_root);
        Self {
            index,
            timestamp: current_timestamp(),
            transactions,
            prev_hash,
            merkle_root,
            nonce,
            hash,
        }
    }

    /// Create the genesis block.
    pub fn genesis(hasher: &dyn BlockHasher) -> Self {
        Self::new(hasher, 0, Vec::new(), GENESIS_PREV_HASH, 0)
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
            && self.prev_hash == GENESIS_PREV_HASH
            && self.nonce == 0
            && self.transactions.is_empty()
            && self.merkle_root == EMPTY_ROOT
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Recompute the hash from the header fields.
    pub fn recompute_hash(&self, hasher: &dyn BlockHasher) -> String {
        compute_block_hash(hasher, &self.prev_hash, self.nonce, &self.merkle_root)
    }

    /// Verify the stored hash matches the header fields.
    pub fn verify_hash(&self, hasher: &dyn BlockHasher) -> bool {
        self.recompute_hash(hasher) == self.hash
    }

    /// Verify the merkle root matches the transactions.
    pub fn verify_merkle_root(&self, hasher: &dyn BlockHasher) -> bool {
        merkle_root_with(hasher, &self.transactions) == self.merkle_root
    }

    /// Check the hash has at least `difficulty` leading hex zeros.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }
}

/// Whether a hex hash starts with `difficulty` `'0'` characters.
pub fn meets_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash_hex.len() >= difficulty && hash_hex.bytes().take(difficulty).all(|b| b == b'0')
}
