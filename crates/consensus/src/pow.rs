//! Proof of Work nonce search.
//!
//! A block is accepted when `H(prev_hash ++ nonce ++ merkle_root)` starts with
//! `difficulty` hexadecimal zeros. The search walks nonces upward from zero.
//! Nothing bounds it unless `max_attempts` is set, so callers running it on a
//! worker should keep a [`CancelFlag`] around.

use cryptochain_core::{compute_block_hash, meets_difficulty, BlockHasher};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Progress is reported every this many nonces by default.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Largest satisfiable difficulty for a 256-bit hash rendered as hex.
pub const MAX_DIFFICULTY: u32 = 64;

/// Errors that can occur during proof-of-work.
#[derive(Debug, Error)]
pub enum PowError {
    #[error("difficulty {0} is outside 1..={MAX_DIFFICULTY}")]
    InvalidDifficulty(u32),

    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("no valid nonce found within {attempts} attempts")]
    Exhausted { attempts: u64 },

    #[error("failed to spawn mining worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("mining worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, PowError>;

/// Proof of Work configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowConfig {
    /// Required count of leading zero hex characters.
    pub difficulty: u32,
    /// Report progress every this many nonces (0 disables reporting).
    pub progress_interval: u64,
    /// Give up after this many hashes. `None` searches forever.
    pub max_attempts: Option<u64>,
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            difficulty: 3,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_attempts: None,
        }
    }
}

impl PowConfig {
    /// Create a configuration with the given difficulty and default reporting.
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Reject difficulties no hash can satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(PowError::InvalidDifficulty(self.difficulty));
        }
        Ok(())
    }
}

/// The header fields a nonce is searched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningJob {
    /// Hash of the block being extended.
    pub prev_hash: String,
    /// Merkle root of the transactions being committed.
    pub merkle_root: String,
}

/// A nonce that satisfies the difficulty target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    /// The qualifying block hash.
    pub hash: String,
    /// Hashes computed, including the winning one.
    pub attempts: u64,
}

/// Cooperative cancellation signal shared with a running search.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the search to stop at the next nonce.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Search for a qualifying nonce.
///
/// `on_progress` receives the next nonce to try each time it is a multiple of
/// `config.progress_interval`.
pub fn search(
    hasher: &dyn BlockHasher,
    config: &PowConfig,
    job: &MiningJob,
    mut on_progress: impl FnMut(u64),
    cancel: &CancelFlag,
) -> Result<Solution> {
    config.validate()?;
    tracing::debug!(
        difficulty = config.difficulty,
        prev_hash = %job.prev_hash,
        merkle_root = %job.merkle_root,
        "starting nonce search"
    );

    let mut nonce: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(attempts = nonce, "nonce search cancelled");
            return Err(PowError::Cancelled { attempts: nonce });
        }
        if config.max_attempts.is_some_and(|max| nonce >= max) {
            return Err(PowError::Exhausted { attempts: nonce });
        }

        let hash = compute_block_hash(hasher, &job.prev_hash, nonce, &job.merkle_root);
        if meets_difficulty(&hash, config.difficulty) {
            tracing::debug!(nonce, %hash, "nonce found");
            return Ok(Solution {
                nonce,
                hash,
                attempts: nonce + 1,
            });
        }

        nonce = nonce
            .checked_add(1)
            .ok_or(PowError::Exhausted { attempts: u64::MAX })?;
        if config.progress_interval > 0 && nonce % config.progress_interval == 0 {
            on_progress(nonce);
        }
    }
}

/// Blocking search with default reporting and no cancellation; returns the nonce.
pub fn mine(
    hasher: &dyn BlockHasher,
    prev_hash: &str,
    merkle_root: &str,
    difficulty: u32,
    on_progress: impl FnMut(u64),
) -> Result<u64> {
    let job = MiningJob {
        prev_hash: prev_hash.to_string(),
        merkle_root: merkle_root.to_string(),
    };
    search(hasher, &PowConfig::new(difficulty), &job, on_progress, &CancelFlag::new())
        .map(|solution| solution.nonce)
}
