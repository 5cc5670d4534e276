//! Transaction and block validation rules.
//!
//! This module validates transactions and blocks according to consensus rules.

use cryptochain_core::{Block, BlockHasher, CryptoContext, Transaction, TransactionError};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("chain is empty")]
    EmptyChain,

    #[error("first block is not a valid genesis block")]
    InvalidGenesis,

    #[error("block index mismatch (expected {expected}, got {got})")]
    InvalidIndex { expected: u64, got: u64 },

    #[error("block {index} prev_hash does not match parent hash")]
    InvalidPrevHash { index: u64 },

    #[error("block {index} merkle root verification failed")]
    InvalidMerkleRoot { index: u64 },

    #[error("block {index} hash does not match its header")]
    InvalidHash { index: u64 },

    #[error("block {index} hash does not meet difficulty {difficulty}")]
    DifficultyNotMet { index: u64, difficulty: u32 },

    #[error("duplicate transaction {txn_id} in block {index}")]
    DuplicateTransaction { index: u64, txn_id: String },

    #[error("invalid transaction {txn_id} in block {index}: {source}")]
    InvalidTransaction {
        index: u64,
        txn_id: String,
        source: TransactionError,
    },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Transaction validator.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Verify a single transaction (amount and signature).
    pub fn validate_transaction(
        ctx: &CryptoContext,
        tx: &Transaction,
    ) -> std::result::Result<(), TransactionError> {
        tx.verify(ctx)
    }

    /// Verify every transaction, stopping at the first failure.
    pub fn validate_all(
        ctx: &CryptoContext,
        txs: &[Transaction],
    ) -> std::result::Result<(), TransactionError> {
        txs.iter()
            .try_for_each(|tx| Self::validate_transaction(ctx, tx))
    }
}

/// Block validator.
pub struct BlockValidator<'a> {
    hasher: &'a dyn BlockHasher,
    ctx: CryptoContext,
    difficulty: u32,
}

impl<'a> BlockValidator<'a> {
    pub fn new(hasher: &'a dyn BlockHasher, difficulty: u32) -> Self {
        Self {
            hasher,
            ctx: CryptoContext::new(),
            difficulty,
        }
    }

    /// Validate block structure and contents.
    pub fn validate_block_structure(&self, block: &Block) -> Result<()> {
        if !block.verify_merkle_root(self.hasher) {
            return Err(ValidationError::InvalidMerkleRoot { index: block.index });
        }

        if !block.verify_hash(self.hasher) {
            return Err(ValidationError::InvalidHash { index: block.index });
        }

        let mut seen = HashSet::new();
        for tx in &block.transactions {
            if !seen.insert(tx.txn_id.as_str()) {
                return Err(ValidationError::DuplicateTransaction {
                    index: block.index,
                    txn_id: tx.txn_id.clone(),
                });
            }
        }

        Ok(())
    }

    /// Validate block extends the parent correctly.
    pub fn validate_block_extends_parent(&self, block: &Block, parent: &Block) -> Result<()> {
        if block.index != parent.index + 1 {
            return Err(ValidationError::InvalidIndex {
                expected: parent.index + 1,
                got: block.index,
            });
        }

        if block.prev_hash != parent.hash {
            return Err(ValidationError::InvalidPrevHash { index: block.index });
        }

        Ok(())
    }

    /// Validate the proof of work.
    pub fn validate_pow(&self, block: &Block) -> Result<()> {
        if !block.meets_difficulty(self.difficulty) {
            return Err(ValidationError::DifficultyNotMet {
                index: block.index,
                difficulty: self.difficulty,
            });
        }
        Ok(())
    }

    /// Validate all transaction signatures in the block.
    pub fn validate_block_transactions(&self, block: &Block) -> Result<()> {
        for tx in &block.transactions {
            TransactionValidator::validate_transaction(&self.ctx, tx).map_err(|source| {
                ValidationError::InvalidTransaction {
                    index: block.index,
                    txn_id: tx.txn_id.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    /// Full block validation (structure + parent + pow + transactions).
    pub fn validate_full(&self, block: &Block, parent: &Block) -> Result<()> {
        self.validate_block_structure(block)?;
        self.validate_block_extends_parent(block, parent)?;
        self.validate_pow(block)?;
        self.validate_block_transactions(block)?;
        Ok(())
    }

    /// Validate a whole chain from genesis.
    pub fn validate_chain(&self, chain: &[Block]) -> Result<()> {
        let genesis = chain.first().ok_or(ValidationError::EmptyChain)?;
        if !genesis.is_genesis() || !genesis.verify_hash(self.hasher) {
            return Err(ValidationError::InvalidGenesis);
        }

        for pair in chain.windows(2) {
            self.validate_full(&pair[1], &pair[0])?;
        }
        Ok(())
    }
}
