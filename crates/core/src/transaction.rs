//! Transaction types and signing.

use crate::amount::{format_amount, Decimal};
use crate::crypto::{CryptoContext, CryptoError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Literal used for the system sender in serialized transactions.
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// Errors that can occur during transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction amount must be positive")]
    NonPositiveAmount,
    #[error("missing signature")]
    MissingSignature,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Origin of a transfer.
///
/// `System` transfers mint funds and are trusted without a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    System,
    Wallet(String),
}

impl Sender {
    /// Public key of a wallet sender.
    pub fn public_key(&self) -> Option<&str> {
        match self {
            Sender::System => None,
            Sender::Wallet(key) => Some(key),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Sender::System)
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::System => f.write_str(SYSTEM_SENDER),
            Sender::Wallet(key) => f.write_str(key),
        }
    }
}

impl From<&str> for Sender {
    fn from(s: &str) -> Self {
        if s == SYSTEM_SENDER {
            Sender::System
        } else {
            Sender::Wallet(s.to_string())
        }
    }
}

impl FromStr for Sender {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Sender::from(s))
    }
}

impl Serialize for Sender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Sender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Sender::from(s.as_str()))
    }
}

/// A transfer between two parties.
///
/// Field order is significant: it fixes the canonical JSON encoding that
/// merkle leaves are hashed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Value to transfer.
    #[serde(with = "crate::amount::json_number")]
    pub amount: Decimal,
    /// Originating party.
    pub sender: Sender,
    /// Recipient's public key (hex).
    pub recipient: String,
    /// Unique identifier (UUID v4 without dashes).
    pub txn_id: String,
    /// DER signature (hex); absent for system transfers.
    pub signature: Option<String>,
}

impl Transaction {
    /// Create a new unsigned transaction with a fresh id.
    pub fn new(amount: impl Into<Decimal>, sender: Sender, recipient: impl Into<String>) -> Self {
        Self {
            amount: amount.into().normalize(),
            sender,
            recipient: recipient.into(),
            txn_id: Uuid::new_v4().simple().to_string(),
            signature: None,
        }
    }

    /// Create a system transfer crediting `recipient`.
    pub fn system(amount: impl Into<Decimal>, recipient: impl Into<String>) -> Self {
        Self::new(amount, Sender::System, recipient)
    }

    /// The string whose SHA-256 digest is signed.
    pub fn signing_message(&self) -> String {
        format!(
            "{}{}{}{}",
            self.txn_id,
            format_amount(&self.amount),
            self.sender,
            self.recipient
        )
    }

    /// Sign with the sender's hex private key. System transfers stay unsigned.
    pub fn sign(&mut self, ctx: &CryptoContext, private_key_hex: &str) -> Result<(), TransactionError> {
        if self.sender.is_system() {
            return Ok(());
        }
        self.signature = Some(ctx.sign(private_key_hex, &self.signing_message())?);
        Ok(())
    }

    /// Create a signed transaction.
    pub fn signed(mut self, ctx: &CryptoContext, private_key_hex: &str) -> Result<Self, TransactionError> {
        self.sign(ctx, private_key_hex)?;
        Ok(self)
    }

    /// Verify the transaction against its sender's public key.
    pub fn verify(&self, ctx: &CryptoContext) -> Result<(), TransactionError> {
        if self.amount <= Decimal::ZERO {
            return Err(TransactionError::NonPositiveAmount);
        }
        let Some(public_key) = self.sender.public_key() else {
            return Ok(());
        };
        let signature = self
            .signature
            .as_deref()
            .ok_or(TransactionError::MissingSignature)?;
        if ctx.verify(public_key, &self.signing_message(), signature) {
            Ok(())
        } else {
            Err(TransactionError::InvalidSignature)
        }
    }

    /// Convenience wrapper around [`Transaction::verify`].
    pub fn is_valid(&self, ctx: &CryptoContext) -> bool {
        self.verify(ctx).is_ok()
    }

    /// Canonical JSON encoding used for merkle leaves.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).expect("transaction serialization should not fail")
    }
}
