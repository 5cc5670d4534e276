//! Ledger configuration.

use crate::mempool::MempoolConfig;
use cryptochain_consensus::{PowConfig, DEFAULT_PROGRESS_INTERVAL, MAX_DIFFICULTY};
use cryptochain_core::{BlockHasher, HmacSha256Hasher, DEFAULT_HASH_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors in a ledger configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("difficulty {0} is outside 1..={MAX_DIFFICULTY}")]
    InvalidDifficulty(u32),

    #[error("hash key must not be empty")]
    EmptyHashKey,

    #[error("max_pending must be at least 1")]
    ZeroMaxPending,
}

/// What `create_wallet` does after enqueuing a funding transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingMode {
    /// Mine a block before returning, so the wallet is funded on return.
    #[default]
    MineImmediately,
    /// Leave the funding transfer pending; the caller decides when to mine.
    Enqueue,
}

/// Whether a sender may be debited below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    /// Accept any correctly signed transfer; balances may go negative.
    #[default]
    AllowNegative,
    /// Reject transfers the sender cannot cover, counting pending outflows.
    RejectOverdraft,
}

/// Blockchain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Required count of leading zero hex characters in a block hash.
    pub difficulty: u32,
    /// Mining progress is reported every this many nonces (0 disables it).
    pub progress_interval: u64,
    /// Optional cap on nonce attempts per block.
    pub max_attempts: Option<u64>,
    /// Wallet funding behavior.
    pub funding: FundingMode,
    /// Overdraft behavior.
    pub balance_policy: BalancePolicy,
    /// Key for the HMAC block hash.
    pub hash_key: String,
    /// Optional cap on pending transactions. Unbounded when absent.
    pub max_pending: Option<usize>,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            difficulty: 3,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_attempts: None,
            funding: FundingMode::default(),
            balance_policy: BalancePolicy::default(),
            hash_key: DEFAULT_HASH_KEY.to_string(),
            max_pending: None,
        }
    }
}

impl BlockchainConfig {
    /// Default configuration with the given difficulty.
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::InvalidDifficulty(self.difficulty));
        }
        if self.hash_key.is_empty() {
            return Err(ConfigError::EmptyHashKey);
        }
        if self.max_pending == Some(0) {
            return Err(ConfigError::ZeroMaxPending);
        }
        Ok(())
    }

    /// Proof-of-work parameters derived from this configuration.
    pub fn pow(&self) -> PowConfig {
        PowConfig {
            difficulty: self.difficulty,
            progress_interval: self.progress_interval,
            max_attempts: self.max_attempts,
        }
    }

    /// Pending pool parameters derived from this configuration.
    pub fn mempool(&self) -> MempoolConfig {
        MempoolConfig {
            max_transactions: self.max_pending,
        }
    }

    /// The block hasher selected by `hash_key`.
    pub fn hasher(&self) -> Arc<dyn BlockHasher> {
        Arc::new(HmacSha256Hasher::new(&self.hash_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BlockchainConfig::default();
        assert_eq!(config.difficulty, 3);
        assert_eq!(config.progress_interval, 100);
        assert_eq!(config.max_attempts, None);
        assert_eq!(config.funding, FundingMode::MineImmediately);
        assert_eq!(config.balance_policy, BalancePolicy::AllowNegative);
        assert_eq!(config.hash_key, "alludam");
        assert_eq!(config.max_pending, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = BlockchainConfig::from_json(
            r#"{"difficulty": 2, "funding": "enqueue", "balance_policy": "reject_overdraft"}"#,
        )
        .unwrap();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.funding, FundingMode::Enqueue);
        assert_eq!(config.balance_policy, BalancePolicy::RejectOverdraft);
        assert_eq!(config.progress_interval, 100);
        assert_eq!(config.max_pending, None);

        let capped = BlockchainConfig::from_json(r#"{"max_pending": 50}"#).unwrap();
        assert_eq!(capped.mempool().max_transactions, Some(50));
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            BlockchainConfig::from_json(r#"{"difficulty": 0}"#),
            Err(ConfigError::InvalidDifficulty(0))
        ));
        assert!(matches!(
            BlockchainConfig::from_json(r#"{"difficulty": 65}"#),
            Err(ConfigError::InvalidDifficulty(65))
        ));
        assert!(matches!(
            BlockchainConfig::from_json(r#"{"hash_key": ""}"#),
            Err(ConfigError::EmptyHashKey)
        ));
        assert!(matches!(
            BlockchainConfig::from_json(r#"{"max_pending": 0}"#),
            Err(ConfigError::ZeroMaxPending)
        ));
        assert!(matches!(
            BlockchainConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_pow_config() {
        let mut config = BlockchainConfig::with_difficulty(4);
        config.max_attempts = Some(10);
        let pow = config.pow();
        assert_eq!(pow.difficulty, 4);
        assert_eq!(pow.max_attempts, Some(10));
        assert_eq!(pow.progress_interval, 100);
    }

    #[test]
    fn test_hasher_uses_key() {
        let a = BlockchainConfig::default().hasher();
        let b = HmacSha256Hasher::default();
        assert_eq!(a.digest_hex("x"), b.digest_hex("x"));
    }
}
