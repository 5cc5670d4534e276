//! Wallet registry keyed by public key.

use cryptochain_core::{Transaction, Wallet};
use std::collections::HashMap;

/// Registered wallets, iterated in creation order.
#[derive(Debug, Default)]
pub struct WalletRegistry {
    wallets: Vec<Wallet>,
    by_key: HashMap<String, usize>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wallet. A wallet already holding the same key is replaced.
    pub fn register(&mut self, wallet: Wallet) -> &Wallet {
        let existing = self.by_key.get(&wallet.public_key).copied();
        let slot = match existing {
            Some(slot) => {
                self.wallets[slot] = wallet;
                slot
            }
            None => {
                self.by_key.insert(wallet.public_key.clone(), self.wallets.len());
                self.wallets.push(wallet);
                self.wallets.len() - 1
            }
        };
        &self.wallets[slot]
    }

    /// Unregister a wallet. Later wallets keep their relative order.
    pub fn remove(&mut self, public_key: &str) -> Option<Wallet> {
        let slot = self.by_key.remove(public_key)?;
        let wallet = self.wallets.remove(slot);
        for index in self.by_key.values_mut() {
            if *index > slot {
                *index -= 1;
            }
        }
        Some(wallet)
    }

    pub fn get(&self, public_key: &str) -> Option<&Wallet> {
        self.by_key.get(public_key).map(|&slot| &self.wallets[slot])
    }

    fn get_mut(&mut self, public_key: &str) -> Option<&mut Wallet> {
        self.by_key
            .get(public_key)
            .map(|&slot| &mut self.wallets[slot])
    }

    pub fn contains(&self, public_key: &str) -> bool {
        self.by_key.contains_key(public_key)
    }

    /// Wallets in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.iter()
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /// Apply committed transfers: debit known senders, credit known recipients.
    ///
    /// Parties missing from the registry, including the system sender, are
    /// left untouched.
    pub fn settle(&mut self, transactions: &[Transaction]) {
        for tx in transactions {
            if let Some(sender) = tx.sender.public_key().and_then(|key| self.get_mut(key)) {
                sender.debit(tx.amount);
                tracing::trace!(wallet = %sender.name, balance = %sender.balance, "debited");
            }
            if let Some(recipient) = self.get_mut(&tx.recipient) {
                recipient.credit(tx.amount);
                tracing::trace!(wallet = %recipient.name, balance = %recipient.balance, "credited");
            }
        }
    }
}
