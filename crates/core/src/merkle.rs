//! Merkle commitment over an ordered list of transactions.
//!
//! Nodes are lowercase hex digests. A parent is the hash of the concatenated
//! hex of its children, and an odd trailing node is paired with itself. The
//! commitment is order dependent.

use crate::hash::{BlockHasher, HmacSha256Hasher};
use crate::transaction::Transaction;

/// Root reported for an empty transaction list.
pub const EMPTY_ROOT: &str = "0";

/// Merkle root using the default block hasher.
pub fn merkle_root(transactions: &[Transaction]) -> String {
    merkle_root_with(&HmacSha256Hasher::default(), transactions)
}

/// Merkle root using an explicit hasher.
pub fn merkle_root_with(hasher: &dyn BlockHasher, transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return EMPTY_ROOT.to_string();
    }

    let mut current_level = leaves(hasher, transactions);

    while current_level.len() > 1 {
        current_level = next_level(hasher, &current_level);
    }

    current_level.swap_remove(0)
}

fn leaves(hasher: &dyn BlockHasher, transactions: &[Transaction]) -> Vec<String> {
    transactions
        .iter()
        .map(|tx| hasher.digest_hex(&tx.canonical_json()))
        .collect()
}

fn parent(hasher: &dyn BlockHasher, left: &str, right: &str) -> String {
    hasher.digest_hex(&format!("{left}{right}"))
}

fn next_level(hasher: &dyn BlockHasher, level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|chunk| match chunk {
            [left, right] => parent(hasher, left, right),
            [single] => parent(hasher, single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// A merkle tree for inclusion proofs.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes in the tree, level by level (leaves first).
    levels: Vec<Vec<String>>,
}

/// A merkle proof for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: String,
    /// Sibling hashes from leaf to root.
    pub siblings: Vec<String>,
    /// Direction for each sibling (true = sibling is on the right).
    pub directions: Vec<bool>,
}

impl MerkleTree {
    /// Build a merkle tree over the given transactions.
    pub fn new(hasher: &dyn BlockHasher, transactions: &[Transaction]) -> Self {
        if transactions.is_empty() {
            return Self {
                levels: vec![vec![EMPTY_ROOT.to_string()]],
            };
        }

        let mut levels = vec![leaves(hasher, transactions)];
        loop {
            let current = &levels[levels.len() - 1];
            if current.len() <= 1 {
                break;
            }
            let next = next_level(hasher, current);
            levels.push(next);
        }

        Self { levels }
    }

    /// Get the root of the merkle tree.
    pub fn root(&self) -> &str {
        self.levels
            .last()
            .and_then(|level| level.first())
            .map(String::as_str)
            .unwrap_or(EMPTY_ROOT)
    }

    /// Get the number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self.levels.first() {
            Some(level) if level.first().map(String::as_str) != Some(EMPTY_ROOT) => level.len(),
            _ => 0,
        }
    }

    /// Generate a proof for the leaf at the given index.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let leaf = self.levels[0][index].clone();
        let mut siblings = Vec::new();
        let mut directions = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let is_right = idx % 2 == 0;
            let sibling_idx = if is_right { idx + 1 } else { idx - 1 };

            // Odd trailing node pairs with itself
            let sibling = level.get(sibling_idx).unwrap_or(&level[idx]).clone();

            siblings.push(sibling);
            directions.push(is_right);
            idx /= 2;
        }

        Some(MerkleProof {
            leaf,
            siblings,
            directions,
        })
    }
}

/// Verify a merkle proof against a given root.
pub fn verify_proof(hasher: &dyn BlockHasher, root: &str, proof: &MerkleProof) -> bool {
    let mut current = proof.leaf.clone();

    for (sibling, is_right) in proof.siblings.iter().zip(proof.directions.iter()) {
        current = if *is_right {
            parent(hasher, &current, sibling)
        } else {
            parent(hasher, sibling, &current)
        };
    }

    current == root
}
