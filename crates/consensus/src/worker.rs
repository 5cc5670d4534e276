//! Background nonce search on a dedicated thread.
//!
//! The worker reports progress over a bounded channel. When the consumer falls
//! behind, intermediate updates are dropped instead of stalling the search.

use crate::pow::{search, CancelFlag, MiningJob, PowConfig, PowError, Result, Solution};
use crossbeam::channel::{bounded, Receiver};
use cryptochain_core::BlockHasher;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Capacity of the progress channel.
const PROGRESS_BUFFER: usize = 64;

/// Handle to a nonce search running on its own thread.
pub struct MiningWorker {
    cancel: CancelFlag,
    progress: Receiver<u64>,
    thread: JoinHandle<Result<Solution>>,
}

impl MiningWorker {
    /// Start searching for a nonce for `job`.
    pub fn spawn(hasher: Arc<dyn BlockHasher>, config: PowConfig, job: MiningJob) -> Result<Self> {
        config.validate()?;

        let cancel = CancelFlag::new();
        let (progress_tx, progress) = bounded(PROGRESS_BUFFER);
        let worker_cancel = cancel.clone();

        let thread = thread::Builder::new()
            .name("pow-worker".to_string())
            .spawn(move || {
                search(
                    hasher.as_ref(),
                    &config,
                    &job,
                    |nonce| {
                        let _ = progress_tx.try_send(nonce);
                    },
                    &worker_cancel,
                )
            })?;

        Ok(Self {
            cancel,
            progress,
            thread,
        })
    }

    /// Ask the worker to stop. Returns immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Progress updates (nonces tried so far). Disconnects when the search ends.
    pub fn progress(&self) -> &Receiver<u64> {
        &self.progress
    }

    /// Drain buffered updates and return the most recent one.
    pub fn latest_progress(&self) -> Option<u64> {
        self.progress.try_iter().last()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the search ends.
    pub fn join(self) -> Result<Solution> {
        self.thread.join().map_err(|_| PowError::WorkerPanicked)?
    }
}
