//! Wallet state representation.

use crate::amount::Decimal;
use crate::crypto::Keypair;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A named balance bound to a secp256k1 keypair.
///
/// Balances are signed: settlement does not stop a sender from overdrawing
/// unless the ledger is configured to reject it up front.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Wallet {
    /// Opaque identifier, independent of the key.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Current settled balance.
    #[serde(with = "crate::amount::json_number")]
    pub balance: Decimal,
    /// Public key (hex), the wallet's address on the ledger.
    pub public_key: String,
    /// Private key (hex). Never serialized.
    #[serde(skip)]
    pub private_key: String,
}

impl Wallet {
    /// Create a wallet with zero balance from an existing keypair.
    pub fn new(name: impl Into<String>, keypair: &Keypair) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            balance: Decimal::ZERO,
            public_key: keypair.public_key_hex(),
            private_key: keypair.private_key_hex(),
        }
    }

    /// Add to the balance.
    pub fn credit(&mut self, amount: Decimal) {
        self.balance = self.balance.saturating_add(amount);
    }

    /// Subtract from the balance, going negative if needed.
    pub fn debit(&mut self, amount: Decimal) {
        self.balance = self.balance.saturating_sub(amount);
    }

    /// Check if the balance covers `amount`.
    pub fn has_balance(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("balance", &self.balance)
            .field("public_key", &format_args!("{}...", &self.public_key[..self.public_key.len().min(16)]))
            .finish_non_exhaustive()
    }
}
