//! Pending transaction pool.
//!
//! The pool keeps submission order, since that order becomes the block's
//! transaction order and feeds the merkle commitment. Mining takes the whole
//! pool at once; there is no partial selection.

use cryptochain_core::{Decimal, Transaction};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Error)]
pub enum MempoolError {
    #[error("transaction {0} already in mempool")]
    DuplicateTransaction(String),

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Configuration for the mempool.
#[derive(Debug, Clone, Default)]
pub struct MempoolConfig {
    /// Maximum number of pending transactions. `None` leaves the pool unbounded.
    pub max_transactions: Option<usize>,
}

/// Transaction mempool.
#[derive(Debug)]
pub struct Mempool {
    config: MempoolConfig,
    /// Pending transactions in submission order.
    transactions: Vec<Transaction>,
    /// Ids of pending transactions for fast lookup.
    ids: HashSet<String>,
}

impl Mempool {
    /// Create a new mempool with default configuration.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    /// Create a new mempool with the given configuration.
    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check if a transaction id is pending.
    pub fn contains(&self, txn_id: &str) -> bool {
        self.ids.contains(txn_id)
    }

    /// Pending transactions in submission order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Append a transaction.
    pub fn add(&mut self, tx: Transaction) -> Result<()> {
        if self.contains(&tx.txn_id) {
            return Err(MempoolError::DuplicateTransaction(tx.txn_id));
        }
        if let Some(max) = self.config.max_transactions {
            if self.transactions.len() >= max {
                return Err(MempoolError::MempoolFull(max));
            }
        }

        self.ids.insert(tx.txn_id.clone());
        self.transactions.push(tx);
        Ok(())
    }

    /// Withdraw a single pending transaction, keeping the order of the rest.
    pub fn remove(&mut self, txn_id: &str) -> Option<Transaction> {
        if !self.ids.remove(txn_id) {
            return None;
        }
        let position = self.transactions.iter().position(|tx| tx.txn_id == txn_id)?;
        Some(self.transactions.remove(position))
    }

    /// Take every pending transaction, leaving the pool empty.
    pub fn take_all(&mut self) -> Vec<Transaction> {
        self.ids.clear();
        std::mem::take(&mut self.transactions)
    }

    /// Put a batch back ahead of anything submitted since it was taken.
    pub fn restore_front(&mut self, batch: Vec<Transaction>) {
        let newer = std::mem::replace(&mut self.transactions, batch);
        self.transactions.extend(newer);
        self.ids = self.transactions.iter().map(|tx| tx.txn_id.clone()).collect();
    }

    /// Total pending amount sent from `public_key`.
    pub fn pending_outflow(&self, public_key: &str) -> Decimal {
        outflow(&self.transactions, public_key)
    }
}

/// Sum of amounts sent from `public_key` in `txs`.
pub(crate) fn outflow(txs: &[Transaction], public_key: &str) -> Decimal {
    txs.iter()
        .filter(|tx| tx.sender.public_key() == Some(public_key))
        .map(|tx| tx.amount)
        .sum()
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptochain_core::Sender;
    use rust_decimal_macros::dec;

    fn tx(amount: i64) -> Transaction {
        Transaction::system(amount, "04aa")
    }

    #[test]
    fn test_mempool_keeps_order() {
        let mut mempool = Mempool::new();
        let (a, b, c) = (tx(1), tx(2), tx(3));
        mempool.add(a.clone()).unwrap();
        mempool.add(b.clone()).unwrap();
        mempool.add(c.clone()).unwrap();

        assert_eq!(mempool.transactions(), &[a, b, c]);
    }

    #[test]
    fn test_mempool_duplicate_rejected() {
        let mut mempool = Mempool::new();
        let t = tx(1);
        mempool.add(t.clone()).unwrap();
        assert!(matches!(
            mempool.add(t),
            Err(MempoolError::DuplicateTransaction(_))
        ));
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_mempool_capacity_limit() {
        let mut mempool = Mempool::with_config(MempoolConfig {
            max_transactions: Some(2),
        });
        assert!(mempool.add(tx(1)).is_ok());
        assert!(mempool.add(tx(2)).is_ok());
        assert!(matches!(mempool.add(tx(3)), Err(MempoolError::MempoolFull(2))));
    }

    #[test]
    fn test_mempool_unbounded_by_default() {
        let mut mempool = Mempool::new();
        for i in 0..10_001 {
            mempool.add(tx(i + 1)).unwrap();
        }
        assert_eq!(mempool.len(), 10_001);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut mempool = Mempool::new();
        let (a, b, c) = (tx(1), tx(2), tx(3));
        mempool.add(a.clone()).unwrap();
        mempool.add(b.clone()).unwrap();
        mempool.add(c.clone()).unwrap();

        assert_eq!(mempool.remove(&b.txn_id), Some(b.clone()));
        assert_eq!(mempool.transactions(), &[a, c]);
        assert!(!mempool.contains(&b.txn_id));
        assert_eq!(mempool.remove(&b.txn_id), None);

        // The id is free again
        mempool.add(b).unwrap();
        assert_eq!(mempool.len(), 3);
    }

    #[test]
    fn test_take_all_empties_pool() {
        let mut mempool = Mempool::new();
        let t = tx(1);
        mempool.add(t.clone()).unwrap();

        let batch = mempool.take_all();
        assert_eq!(batch, vec![t.clone()]);
        assert!(mempool.is_empty());
        assert!(!mempool.contains(&t.txn_id));
    }

    #[test]
    fn test_restore_front_keeps_newer_behind() {
        let mut mempool = Mempool::new();
        let (a, b, c) = (tx(1), tx(2), tx(3));
        mempool.add(a.clone()).unwrap();
        mempool.add(b.clone()).unwrap();

        let batch = mempool.take_all();
        mempool.add(c.clone()).unwrap();
        mempool.restore_front(batch);

        assert_eq!(mempool.transactions(), &[a.clone(), b, c]);
        assert!(mempool.contains(&a.txn_id));
    }

    #[test]
    fn test_pending_outflow() {
        let mut mempool = Mempool::new();
        mempool.add(Transaction::new(10, Sender::Wallet("alice".into()), "bob")).unwrap();
        mempool.add(Transaction::new(dec!(5.25), Sender::Wallet("alice".into()), "carol")).unwrap();
        mempool.add(Transaction::new(7, Sender::Wallet("bob".into()), "alice")).unwrap();
        mempool.add(Transaction::system(100, "alice")).unwrap();

        assert_eq!(mempool.pending_outflow("alice"), dec!(15.25));
        assert_eq!(mempool.pending_outflow("bob"), dec!(7));
        assert_eq!(mempool.pending_outflow("carol"), Decimal::ZERO);
    }
}
