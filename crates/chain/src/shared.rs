//! Thread-safe ledger handle with background mining.
//!
//! The lock is held only while the pending set is frozen and while the mined
//! block is committed. Submissions made during the nonce search go to the
//! pool and land in the next block.

use crate::blockchain::{Blockchain, BlockchainError, PendingBlock, Result};
use crate::config::BlockchainConfig;
use cryptochain_consensus::MiningWorker;
use cryptochain_core::{Block, Decimal, Sender, Transaction, Wallet};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;

/// How long a dropped [`MiningSession`] waits for the ledger lock.
const DROP_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Cloneable handle to a ledger shared between threads.
#[derive(Clone)]
pub struct SharedBlockchain {
    inner: Arc<Mutex<Blockchain>>,
}

impl SharedBlockchain {
    pub fn new(config: BlockchainConfig) -> Result<Self> {
        Ok(Self::from_blockchain(Blockchain::new(config)?))
    }

    pub fn from_blockchain(blockchain: Blockchain) -> Self {
        Self {
            inner: Arc::new(Mutex::new(blockchain)),
        }
    }

    /// Lock the ledger for reads or direct calls.
    ///
    /// The lock is not reentrant. While the guard is alive on a thread, that
    /// thread must not call any other method of this handle or
    /// [`MiningSession::finish`], which lock again and would block forever.
    /// Dropping a [`MiningSession`] under the guard does not block; the
    /// snapshot then stays in flight until [`Blockchain::cancel_in_flight`].
    ///
    /// Do not call [`Blockchain::mine`] through the guard from a thread other
    /// threads are waiting on; use [`SharedBlockchain::start_mining`].
    pub fn lock(&self) -> MutexGuard<'_, Blockchain> {
        self.inner.lock()
    }

    pub fn register_wallet(&self, name: &str) -> Wallet {
        self.inner.lock().register_wallet(name)
    }

    pub fn fund_wallet(&self, public_key: &str, amount: impl Into<Decimal>) -> Result<Transaction> {
        self.inner.lock().fund_wallet(public_key, amount)
    }

    /// Register a wallet and enqueue its funding transfer.
    ///
    /// Funding always waits for the next mined block here, whatever the
    /// configured funding mode. On error the wallet is not registered.
    pub fn create_wallet(&self, name: &str, initial_balance: impl Into<Decimal>) -> Result<Wallet> {
        self.inner
            .lock()
            .create_wallet_with(name, initial_balance.into(), false)
    }

    pub fn create_transaction(
        &self,
        amount: impl Into<Decimal>,
        sender: Sender,
        recipient: &str,
        sender_private_key: &str,
    ) -> Result<Transaction> {
        self.inner
            .lock()
            .create_transaction(amount, sender, recipient, sender_private_key)
    }

    /// Freeze the pending set and search for a nonce on a worker thread.
    ///
    /// Returns `None` when nothing is pending.
    pub fn start_mining(&self) -> Result<Option<MiningSession>> {
        let mut ledger = self.inner.lock();
        let Some(pending) = ledger.prepare_block()? else {
            return Ok(None);
        };

        match MiningWorker::spawn(ledger.hasher(), ledger.config().pow(), pending.job()) {
            Ok(worker) => Ok(Some(MiningSession {
                ledger: Arc::clone(&self.inner),
                pending: Some(pending),
                worker: Some(worker),
            })),
            Err(e) => {
                ledger.abandon_block(pending);
                Err(e.into())
            }
        }
    }
}

/// A block being mined in the background.
///
/// Dropping an unfinished session cancels the search and puts its
/// transactions back at the front of the pool. If the ledger stays locked for
/// longer than a short timeout, the snapshot is left in flight instead and a
/// warning is logged.
pub struct MiningSession {
    ledger: Arc<Mutex<Blockchain>>,
    pending: Option<PendingBlock>,
    worker: Option<MiningWorker>,
}

impl MiningSession {
    /// Index of the block being mined.
    pub fn index(&self) -> u64 {
        self.pending.as_ref().map_or(0, |p| p.index)
    }

    /// Transactions frozen into this block.
    pub fn transactions(&self) -> &[Transaction] {
        self.pending
            .as_ref()
            .map(|p| p.transactions.as_slice())
            .unwrap_or_default()
    }

    /// Most recent progress report, draining older ones.
    pub fn latest_progress(&self) -> Option<u64> {
        self.worker.as_ref().and_then(MiningWorker::latest_progress)
    }

    /// Whether the nonce search has ended.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, MiningWorker::is_finished)
    }

    /// Stop the search. [`MiningSession::finish`] then reports cancellation.
    pub fn cancel(&self) {
        if let Some(worker) = &self.worker {
            worker.cancel();
        }
    }

    /// Wait for the search, then commit the block.
    ///
    /// On failure the snapshot is returned to the pool.
    pub fn finish(mut self) -> Result<Block> {
        let (Some(worker), Some(pending)) = (self.worker.take(), self.pending.take()) else {
            return Err(BlockchainError::StaleSnapshot);
        };

        let outcome = worker.join();
        let mut ledger = self.ledger.lock();
        match outcome {
            Ok(solution) => ledger.commit_block(pending, &solution),
            Err(e) => {
                ledger.abandon_block(pending);
                Err(e.into())
            }
        }
    }
}

impl Drop for MiningSession {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel();
            let _ = worker.join();
        }
        if let Some(pending) = self.pending.take() {
            match self.ledger.try_lock_for(DROP_LOCK_TIMEOUT) {
                Some(mut ledger) => ledger.abandon_block(pending),
                None => tracing::warn!(
                    index = pending.index,
                    transactions = pending.transactions.len(),
                    "ledger busy while dropping mining session, snapshot left in flight"
                ),
            }
        }
    }
}
