//! Main ledger orchestration.
//!
//! This module brings together the pending pool, proof-of-work, block
//! assembly and wallet settlement.

use crate::config::{BalancePolicy, BlockchainConfig, ConfigError, FundingMode};
use crate::mempool::{outflow, Mempool, MempoolError};
use crate::wallets::WalletRegistry;
use cryptochain_consensus::{
    search, BlockValidator, CancelFlag, MiningJob, PowError, Solution, TransactionValidator,
    ValidationError,
};
use cryptochain_core::{
    merkle_root_with, Block, BlockHasher, CryptoContext, Decimal, Keypair, Sender, Transaction,
    TransactionError, Wallet,
};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] TransactionError),

    #[error("mining failed: {0}")]
    Mining(#[from] PowError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("mempool error: {0}")]
    Mempool(#[from] MempoolError),

    #[error("wallet not registered: {0}")]
    UnknownWallet(String),

    #[error("insufficient funds (available {available}, required {required})")]
    InsufficientFunds { available: Decimal, required: Decimal },

    #[error("a block is already being mined")]
    MiningInProgress,

    #[error("chain tip moved while the block was being mined")]
    StaleSnapshot,
}

pub type Result<T> = std::result::Result<T, BlockchainError>;

/// A frozen batch of pending transactions awaiting a nonce.
#[derive(Debug, Clone)]
pub struct PendingBlock {
    /// Index the block will take.
    pub index: u64,
    /// Hash of the block being extended.
    pub prev_hash: String,
    /// Merkle root of `transactions`.
    pub merkle_root: String,
    /// The snapshot, in submission order.
    pub transactions: Vec<Transaction>,
    /// Identifies the snapshot this block was frozen from.
    snapshot: u64,
}

impl PendingBlock {
    /// The search input for this block.
    pub fn job(&self) -> MiningJob {
        MiningJob {
            prev_hash: self.prev_hash.clone(),
            merkle_root: self.merkle_root.clone(),
        }
    }
}

/// The snapshot currently out for mining.
#[derive(Debug)]
struct InFlight {
    snapshot: u64,
    transactions: Vec<Transaction>,
}

/// Main blockchain struct that orchestrates all components.
pub struct Blockchain {
    config: BlockchainConfig,
    hasher: Arc<dyn BlockHasher>,
    ctx: CryptoContext,
    /// Committed blocks, genesis first.
    chain: Vec<Block>,
    /// Transactions waiting for the next block.
    mempool: Mempool,
    wallets: WalletRegistry,
    /// Snapshot currently being mined, if any.
    in_flight: Option<InFlight>,
    next_snapshot: u64,
}

impl Blockchain {
    /// Create a ledger holding only the genesis block.
    pub fn new(config: BlockchainConfig) -> Result<Self> {
        let hasher = config.hasher();
        Self::with_hasher(config, hasher)
    }

    /// Create a ledger with an explicit block hasher.
    ///
    /// The hasher overrides `config.hash_key`.
    pub fn with_hasher(config: BlockchainConfig, hasher: Arc<dyn BlockHasher>) -> Result<Self> {
        config.validate()?;
        let genesis = Block::genesis(hasher.as_ref());
        tracing::debug!(hash = %genesis.hash, difficulty = config.difficulty, "created genesis block");

        let mempool = Mempool::with_config(config.mempool());
        Ok(Self {
            config,
            hasher,
            ctx: CryptoContext::new(),
            chain: vec![genesis],
            mempool,
            wallets: WalletRegistry::new(),
            in_flight: None,
            next_snapshot: 0,
        })
    }

    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// The hasher shared by mining, block construction and merkle commitment.
    pub fn hasher(&self) -> Arc<dyn BlockHasher> {
        Arc::clone(&self.hasher)
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    /// Committed blocks, genesis first.
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Get the latest block.
    pub fn last_block(&self) -> &Block {
        // The chain always holds at least the genesis block
        &self.chain[self.chain.len() - 1]
    }

    /// Get the current chain height (0 when only genesis exists).
    pub fn height(&self) -> u64 {
        self.last_block().index
    }

    /// Transactions waiting for the next block, in submission order.
    pub fn pending_transactions(&self) -> &[Transaction] {
        self.mempool.transactions()
    }

    pub fn wallets(&self) -> &WalletRegistry {
        &self.wallets
    }

    /// Look up a wallet by public key.
    pub fn wallet(&self, public_key: &str) -> Option<&Wallet> {
        self.wallets.get(public_key)
    }

    /// Whether a snapshot is currently being mined.
    pub fn is_mining(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Generate a keypair and register an unfunded wallet.
    pub fn register_wallet(&mut self, name: &str) -> Wallet {
        let keypair = Keypair::generate();
        let wallet = self.wallets.register(Wallet::new(name, &keypair)).clone();
        tracing::info!(name, public_key = %short(&wallet.public_key), "registered wallet");
        wallet
    }

    /// Enqueue a system transfer crediting a registered wallet.
    pub fn fund_wallet(&mut self, public_key: &str, amount: impl Into<Decimal>) -> Result<Transaction> {
        if !self.wallets.contains(public_key) {
            return Err(BlockchainError::UnknownWallet(public_key.to_string()));
        }
        self.create_transaction(amount, Sender::System, public_key, "")
    }

    /// Create a wallet, funding it from the system sender when
    /// `initial_balance` is positive.
    ///
    /// With [`FundingMode::MineImmediately`] the funding transfer is mined,
    /// together with anything else pending, before this returns.
    ///
    /// On error nothing is left behind: the wallet is unregistered and its
    /// funding transfer withdrawn from the pool.
    pub fn create_wallet(&mut self, name: &str, initial_balance: impl Into<Decimal>) -> Result<Wallet> {
        let mine_now = self.config.funding == FundingMode::MineImmediately;
        self.create_wallet_with(name, initial_balance.into(), mine_now)
    }

    pub(crate) fn create_wallet_with(
        &mut self,
        name: &str,
        initial_balance: Decimal,
        mine_now: bool,
    ) -> Result<Wallet> {
        let wallet = self.register_wallet(name);
        if initial_balance.is_zero() {
            return Ok(wallet);
        }

        if let Err(e) = self.fund_new_wallet(&wallet.public_key, initial_balance, mine_now) {
            self.wallets.remove(&wallet.public_key);
            tracing::warn!(name, error = %e, "wallet creation failed, unregistered wallet");
            return Err(e);
        }

        self.wallets
            .get(&wallet.public_key)
            .cloned()
            .ok_or(BlockchainError::UnknownWallet(wallet.public_key))
    }

    fn fund_new_wallet(&mut self, public_key: &str, amount: Decimal, mine_now: bool) -> Result<()> {
        let funding = self.fund_wallet(public_key, amount)?;
        if mine_now {
            // A failed mine hands its snapshot back to the pool first
            if let Err(e) = self.mine() {
                self.mempool.remove(&funding.txn_id);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Build, sign, verify and enqueue a transfer.
    ///
    /// `sender_private_key` is ignored for the system sender. Nothing is
    /// enqueued when verification or the balance policy rejects the transfer.
    pub fn create_transaction(
        &mut self,
        amount: impl Into<Decimal>,
        sender: Sender,
        recipient: &str,
        sender_private_key: &str,
    ) -> Result<Transaction> {
        let tx = Transaction::new(amount, sender, recipient);
        let tx = match tx.signed(&self.ctx, sender_private_key) {
            Ok(tx) => tx,
            Err(e) => {
                tracing::warn!(error = %e, "failed to sign transaction");
                return Err(e.into());
            }
        };

        if let Err(e) = TransactionValidator::validate_transaction(&self.ctx, &tx) {
            tracing::warn!(txn_id = %tx.txn_id, error = %e, "rejected transaction");
            return Err(e.into());
        }
        self.check_balance_policy(&tx)?;

        self.mempool.add(tx.clone())?;
        tracing::debug!(
            txn_id = %tx.txn_id,
            amount = %tx.amount,
            sender = %short(&tx.sender.to_string()),
            pending = self.mempool.len(),
            "accepted transaction"
        );
        Ok(tx)
    }

    fn check_balance_policy(&self, tx: &Transaction) -> Result<()> {
        if self.config.balance_policy == BalancePolicy::AllowNegative {
            return Ok(());
        }
        let Some(key) = tx.sender.public_key() else {
            return Ok(());
        };
        let wallet = self
            .wallets
            .get(key)
            .ok_or_else(|| BlockchainError::UnknownWallet(key.to_string()))?;

        let committed = self.mempool.pending_outflow(key)
            + self
                .in_flight
                .as_ref()
                .map_or(Decimal::ZERO, |flight| outflow(&flight.transactions, key));
        if !wallet.has_balance(committed + tx.amount) {
            return Err(BlockchainError::InsufficientFunds {
                available: wallet.balance - committed,
                required: tx.amount,
            });
        }
        Ok(())
    }

    /// Re-verify every pending transaction without changing anything.
    pub fn validate_pending_transactions(&self) -> Result<()> {
        TransactionValidator::validate_all(&self.ctx, self.mempool.transactions())?;
        Ok(())
    }

    /// Mine all pending transactions into a new block.
    ///
    /// Returns `None` when nothing is pending.
    pub fn mine(&mut self) -> Result<Option<Block>> {
        self.mine_with_progress(|_| {})
    }

    /// Like [`Blockchain::mine`], reporting nonce progress to `on_progress`.
    pub fn mine_with_progress(&mut self, on_progress: impl FnMut(u64)) -> Result<Option<Block>> {
        let Some(pending) = self.prepare_block()? else {
            return Ok(None);
        };

        let pow = self.config.pow();
        match search(self.hasher.as_ref(), &pow, &pending.job(), on_progress, &CancelFlag::new()) {
            Ok(solution) => self.commit_block(pending, &solution).map(Some),
            Err(e) => {
                self.abandon_block(pending);
                Err(e.into())
            }
        }
    }

    /// Validate the pool and freeze it into a [`PendingBlock`].
    ///
    /// The pool is empty afterwards; new submissions form the next batch.
    /// Every snapshot must be handed back through [`Blockchain::commit_block`]
    /// or [`Blockchain::abandon_block`].
    pub fn prepare_block(&mut self) -> Result<Option<PendingBlock>> {
        if self.in_flight.is_some() {
            return Err(BlockchainError::MiningInProgress);
        }
        if self.mempool.is_empty() {
            return Ok(None);
        }
        self.validate_pending_transactions()?;

        let transactions = self.mempool.take_all();
        let merkle_root = merkle_root_with(self.hasher.as_ref(), &transactions);
        let snapshot = self.next_snapshot;
        self.next_snapshot += 1;
        let pending = PendingBlock {
            index: self.chain.len() as u64,
            prev_hash: self.last_block().hash.clone(),
            merkle_root,
            transactions,
            snapshot,
        };

        tracing::info!(
            index = pending.index,
            transactions = pending.transactions.len(),
            difficulty = self.config.difficulty,
            "mining block"
        );
        self.in_flight = Some(InFlight {
            snapshot,
            transactions: pending.transactions.clone(),
        });
        Ok(Some(pending))
    }

    fn owns_in_flight(&self, pending: &PendingBlock) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|flight| flight.snapshot == pending.snapshot)
    }

    /// Append a mined block and settle balances.
    ///
    /// A snapshot already recovered by [`Blockchain::cancel_in_flight`] is
    /// rejected as stale and leaves the pool untouched.
    pub fn commit_block(&mut self, pending: PendingBlock, solution: &Solution) -> Result<Block> {
        if !self.owns_in_flight(&pending) {
            return Err(BlockchainError::StaleSnapshot);
        }
        if pending.prev_hash != self.last_block().hash || pending.index != self.chain.len() as u64 {
            self.abandon_block(pending);
            return Err(BlockchainError::StaleSnapshot);
        }

        let block = Block::with_merkle_root(
            self.hasher.as_ref(),
            pending.index,
            pending.transactions,
            pending.prev_hash,
            pending.merkle_root,
            solution.nonce,
        );

        let validator = BlockValidator::new(self.hasher.as_ref(), self.config.difficulty);
        if let Err(e) = validator.validate_full(&block, self.last_block()) {
            self.abandon_block(PendingBlock {
                index: block.index,
                prev_hash: block.prev_hash,
                merkle_root: block.merkle_root,
                transactions: block.transactions,
                snapshot: pending.snapshot,
            });
            return Err(e.into());
        }

        self.wallets.settle(&block.transactions);
        self.chain.push(block.clone());
        self.in_flight = None;

        tracing::info!(
            index = block.index,
            nonce = block.nonce,
            hash = %block.hash,
            attempts = solution.attempts,
            "block committed"
        );
        Ok(block)
    }

    /// Return a snapshot to the front of the pool.
    ///
    /// Does nothing if the snapshot was already recovered.
    pub fn abandon_block(&mut self, pending: PendingBlock) {
        if !self.owns_in_flight(&pending) {
            tracing::debug!(index = pending.index, "snapshot already recovered");
            return;
        }
        tracing::warn!(
            index = pending.index,
            transactions = pending.transactions.len(),
            "abandoning block, restoring transactions"
        );
        self.mempool.restore_front(pending.transactions);
        self.in_flight = None;
    }

    /// Put the in-flight snapshot back in the pool without its [`PendingBlock`].
    ///
    /// Recovers from a mining session that could not hand its snapshot back.
    /// A later commit or abandon of that snapshot is ignored. Returns the
    /// number of transactions restored.
    pub fn cancel_in_flight(&mut self) -> usize {
        let Some(flight) = self.in_flight.take() else {
            return 0;
        };
        let count = flight.transactions.len();
        tracing::warn!(transactions = count, "cancelled in-flight snapshot, restoring transactions");
        self.mempool.restore_front(flight.transactions);
        count
    }

    /// Re-check every block link, merkle root, hash and difficulty target.
    pub fn validate_chain(&self) -> Result<()> {
        BlockValidator::new(self.hasher.as_ref(), self.config.difficulty)
            .validate_chain(&self.chain)?;
        Ok(())
    }

    /// Get blockchain statistics.
    pub fn stats(&self) -> BlockchainStats {
        let latest = self.last_block();
        BlockchainStats {
            height: latest.index,
            latest_block_hash: latest.hash.clone(),
            latest_timestamp: latest.timestamp,
            pending_transactions: self.mempool.len(),
            wallet_count: self.wallets.len(),
            difficulty: self.config.difficulty,
        }
    }
}

fn short(key: &str) -> &str {
    &key[..key.len().min(16)]
}

/// Blockchain statistics.
#[derive(Debug, Clone)]
pub struct BlockchainStats {
    /// Current chain height.
    pub height: u64,
    /// Hash of the latest block.
    pub latest_block_hash: String,
    /// Timestamp of the latest block.
    pub latest_timestamp: u64,
    /// Number of pending transactions.
    pub pending_transactions: usize,
    /// Number of registered wallets.
    pub wallet_count: usize,
    pub difficulty: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn setup_blockchain() -> Blockchain {
        Blockchain::new(BlockchainConfig::with_difficulty(1)).unwrap()
    }

    #[test]
    fn test_blockchain_init() {
        let blockchain = setup_blockchain();

        assert_eq!(blockchain.height(), 0);
        assert_eq!(blockchain.chain().len(), 1);
        assert!(blockchain.last_block().is_genesis());
        assert!(blockchain.pending_transactions().is_empty());
        assert!(blockchain.wallets().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            Blockchain::new(BlockchainConfig::with_difficulty(0)),
            Err(BlockchainError::Config(ConfigError::InvalidDifficulty(0)))
        ));
    }

    #[test]
    fn test_register_wallet_is_unfunded() {
        let mut blockchain = setup_blockchain();
        let wallet = blockchain.register_wallet("Carol");

        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(blockchain.chain().len(), 1);
        assert!(blockchain.wallet(&wallet.public_key).is_some());
    }

    #[test]
    fn test_create_wallet_with_zero_balance_does_not_mine() {
        let mut blockchain = setup_blockchain();
        let wallet = blockchain.create_wallet("Carol", 0).unwrap();

        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(blockchain.chain().len(), 1);
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_create_wallet_rolls_back_when_mining_exhausts() {
        let mut config = BlockchainConfig::with_difficulty(64);
        config.max_attempts = Some(10);
        let mut blockchain = Blockchain::new(config).unwrap();

        assert!(matches!(
            blockchain.create_wallet("Alice", 100),
            Err(BlockchainError::Mining(PowError::Exhausted { attempts: 10 }))
        ));
        assert!(blockchain.wallets().is_empty());
        assert!(blockchain.pending_transactions().is_empty());
        assert!(!blockchain.is_mining());
        assert_eq!(blockchain.chain().len(), 1);
    }

    #[test]
    fn test_create_wallet_rolls_back_while_mining() {
        let mut blockchain = setup_blockchain();
        let alice = blockchain.register_wallet("Alice");
        blockchain.fund_wallet(&alice.public_key, 5).unwrap();
        let pending = blockchain.prepare_block().unwrap().unwrap();
        let late = blockchain.fund_wallet(&alice.public_key, 1).unwrap();

        assert!(matches!(
            blockchain.create_wallet("Bob", 10),
            Err(BlockchainError::MiningInProgress)
        ));
        assert_eq!(blockchain.wallets().len(), 1);
        assert_eq!(blockchain.pending_transactions(), &[late]);
        assert!(blockchain.is_mining());

        blockchain.abandon_block(pending);
        assert_eq!(blockchain.pending_transactions().len(), 2);
    }

    #[test]
    fn test_create_wallet_rejects_negative_balance() {
        let mut blockchain = setup_blockchain();
        assert!(matches!(
            blockchain.create_wallet("Alice", dec!(-1)),
            Err(BlockchainError::InvalidTransaction(TransactionError::NonPositiveAmount))
        ));
        assert!(blockchain.wallets().is_empty());
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_fractional_funding_settles_exactly() {
        let mut blockchain = setup_blockchain();
        let alice = blockchain.create_wallet("Alice", dec!(12.5)).unwrap();
        let bob = blockchain.register_wallet("Bob");

        blockchain
            .create_transaction(
                dec!(0.1),
                Sender::Wallet(alice.public_key.clone()),
                &bob.public_key,
                &alice.private_key,
            )
            .unwrap();
        blockchain
            .create_transaction(
                dec!(0.2),
                Sender::Wallet(alice.public_key.clone()),
                &bob.public_key,
                &alice.private_key,
            )
            .unwrap();
        blockchain.mine().unwrap().unwrap();

        assert_eq!(alice.balance, dec!(12.5));
        assert_eq!(blockchain.wallet(&alice.public_key).unwrap().balance, dec!(12.2));
        assert_eq!(blockchain.wallet(&bob.public_key).unwrap().balance, dec!(0.3));
        assert!(blockchain.validate_chain().is_ok());
    }

    #[test]
    fn test_fund_unknown_wallet_rejected() {
        let mut blockchain = setup_blockchain();
        assert!(matches!(
            blockchain.fund_wallet("04nobody", 10),
            Err(BlockchainError::UnknownWallet(_))
        ));
    }

    #[test]
    fn test_enqueue_funding_mode() {
        let mut config = BlockchainConfig::with_difficulty(1);
        config.funding = FundingMode::Enqueue;
        let mut blockchain = Blockchain::new(config).unwrap();

        let alice = blockchain.create_wallet("Alice", 100).unwrap();
        assert_eq!(alice.balance, Decimal::ZERO);
        assert_eq!(blockchain.pending_transactions().len(), 1);
        assert_eq!(blockchain.chain().len(), 1);

        blockchain.mine().unwrap().unwrap();
        assert_eq!(blockchain.wallet(&alice.public_key).unwrap().balance, dec!(100));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let mut blockchain = setup_blockchain();
        let alice = blockchain.create_wallet("Alice", 10).unwrap();
        let bob = blockchain.register_wallet("Bob");

        for amount in [dec!(0), dec!(-2.5)] {
            let result = blockchain.create_transaction(
                amount,
                Sender::Wallet(alice.public_key.clone()),
                &bob.public_key,
                &alice.private_key,
            );
            assert!(matches!(
                result,
                Err(BlockchainError::InvalidTransaction(TransactionError::NonPositiveAmount))
            ));
        }
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_malformed_private_key_rejected() {
        let mut blockchain = setup_blockchain();
        let alice = blockchain.register_wallet("Alice");
        let bob = blockchain.register_wallet("Bob");

        let result = blockchain.create_transaction(
            5,
            Sender::Wallet(alice.public_key.clone()),
            &bob.public_key,
            "not-a-key",
        );
        assert!(matches!(result, Err(BlockchainError::InvalidTransaction(_))));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_validate_pending_detects_tampering() {
        let mut blockchain = setup_blockchain();
        let alice = blockchain.create_wallet("Alice", 50).unwrap();
        let bob = blockchain.register_wallet("Bob");

        blockchain
            .create_transaction(
                20,
                Sender::Wallet(alice.public_key.clone()),
                &bob.public_key,
                &alice.private_key,
            )
            .unwrap();
        assert!(blockchain.validate_pending_transactions().is_ok());

        // Tamper with the queued transfer behind the ledger's back
        let mut batch = blockchain.mempool.take_all();
        batch[0].amount = dec!(2000);
        blockchain.mempool.restore_front(batch);

        assert!(matches!(
            blockchain.validate_pending_transactions(),
            Err(BlockchainError::InvalidTransaction(TransactionError::InvalidSignature))
        ));

        let height = blockchain.height();
        assert!(blockchain.mine().is_err());
        assert_eq!(blockchain.height(), height);
        assert_eq!(blockchain.pending_transactions().len(), 1);
        assert!(!blockchain.is_mining());
    }

    #[test]
    fn test_mine_reports_progress() {
        let mut config = BlockchainConfig::with_difficulty(3);
        config.progress_interval = 1;
        let mut blockchain = Blockchain::new(config).unwrap();
        let alice = blockchain.register_wallet("Alice");
        blockchain.fund_wallet(&alice.public_key, 5).unwrap();

        let mut reports = Vec::new();
        let block = blockchain
            .mine_with_progress(|n| reports.push(n))
            .unwrap()
            .unwrap();

        assert_eq!(reports.len() as u64, block.nonce);
        assert!(block.hash.starts_with("000"));
    }

    #[test]
    fn test_exhausted_search_restores_pool() {
        let mut config = BlockchainConfig::with_difficulty(64);
        config.max_attempts = Some(200);
        config.funding = FundingMode::Enqueue;
        let mut blockchain = Blockchain::new(config).unwrap();
        blockchain.create_wallet("Alice", 5).unwrap();

        assert!(matches!(
            blockchain.mine(),
            Err(BlockchainError::Mining(PowError::Exhausted { attempts: 200 }))
        ));
        assert_eq!(blockchain.chain().len(), 1);
        assert_eq!(blockchain.pending_transactions().len(), 1);
        assert!(!blockchain.is_mining());
    }

    #[test]
    fn test_prepare_block_is_exclusive() {
        let mut config = BlockchainConfig::with_difficulty(1);
        config.funding = FundingMode::Enqueue;
        let mut blockchain = Blockchain::new(config).unwrap();
        blockchain.create_wallet("Alice", 5).unwrap();

        let pending = blockchain.prepare_block().unwrap().unwrap();
        assert!(blockchain.pending_transactions().is_empty());
        assert!(matches!(
            blockchain.prepare_block(),
            Err(BlockchainError::MiningInProgress)
        ));

        blockchain.abandon_block(pending);
        assert_eq!(blockchain.pending_transactions().len(), 1);
        assert!(blockchain.prepare_block().unwrap().is_some());
    }

    #[test]
    fn test_commit_rejects_bad_nonce() {
        let mut config = BlockchainConfig::with_difficulty(4);
        config.funding = FundingMode::Enqueue;
        let mut blockchain = Blockchain::new(config).unwrap();
        blockchain.create_wallet("Alice", 5).unwrap();

        let pending = blockchain.prepare_block().unwrap().unwrap();
        let hasher = blockchain.hasher();
        // Find a nonce that does not satisfy difficulty 4
        let nonce = (0..)
            .find(|&n| {
                !cryptochain_core::meets_difficulty(
                    &cryptochain_core::compute_block_hash(
                        hasher.as_ref(),
                        &pending.prev_hash,
                        n,
                        &pending.merkle_root,
                    ),
                    4,
                )
            })
            .unwrap();
        let bogus = Solution {
            nonce,
            hash: String::new(),
            attempts: 1,
        };

        assert!(matches!(
            blockchain.commit_block(pending, &bogus),
            Err(BlockchainError::Validation(ValidationError::DifficultyNotMet { .. }))
        ));
        assert_eq!(blockchain.chain().len(), 1);
        assert_eq!(blockchain.pending_transactions().len(), 1);
    }

    #[test]
    fn test_cancel_in_flight_restores_and_fences_old_snapshot() {
        let mut config = BlockchainConfig::with_difficulty(1);
        config.funding = FundingMode::Enqueue;
        let mut blockchain = Blockchain::new(config).unwrap();
        blockchain.create_wallet("Alice", 5).unwrap();

        let stale = blockchain.prepare_block().unwrap().unwrap();
        assert_eq!(blockchain.cancel_in_flight(), 1);
        assert_eq!(blockchain.cancel_in_flight(), 0);
        assert!(!blockchain.is_mining());
        assert_eq!(blockchain.pending_transactions().len(), 1);

        let fresh = blockchain.prepare_block().unwrap().unwrap();
        let pow = blockchain.config().pow();
        let hasher = blockchain.hasher();
        let stale_solution =
            search(hasher.as_ref(), &pow, &stale.job(), |_| {}, &CancelFlag::new()).unwrap();

        // The recovered snapshot neither commits nor restores a second copy
        assert!(matches!(
            blockchain.commit_block(stale.clone(), &stale_solution),
            Err(BlockchainError::StaleSnapshot)
        ));
        blockchain.abandon_block(stale);
        assert!(blockchain.pending_transactions().is_empty());
        assert!(blockchain.is_mining());

        let solution =
            search(hasher.as_ref(), &pow, &fresh.job(), |_| {}, &CancelFlag::new()).unwrap();
        let block = blockchain.commit_block(fresh, &solution).unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(blockchain.chain().len(), 2);
    }

    #[test]
    fn test_custom_hasher_shared_by_mining_and_validation() {
        let hasher: Arc<dyn BlockHasher> = Arc::new(cryptochain_core::Sha256Hasher);
        let mut blockchain =
            Blockchain::with_hasher(BlockchainConfig::with_difficulty(2), hasher.clone()).unwrap();
        blockchain.create_wallet("Alice", 10).unwrap();

        let block = blockchain.last_block().clone();
        assert!(block.verify_hash(hasher.as_ref()));
        assert!(blockchain.validate_chain().is_ok());
        assert!(block.meets_difficulty(2));
    }

    #[test]
    fn test_reject_overdraft_policy() {
        let mut config = BlockchainConfig::with_difficulty(1);
        config.balance_policy = BalancePolicy::RejectOverdraft;
        let mut blockchain = Blockchain::new(config).unwrap();

        let alice = blockchain.create_wallet("Alice", 50).unwrap();
        let bob = blockchain.register_wallet("Bob");
        let send = |chain: &mut Blockchain, amount: Decimal| {
            chain.create_transaction(
                amount,
                Sender::Wallet(alice.public_key.clone()),
                &bob.public_key,
                &alice.private_key,
            )
        };

        assert!(send(&mut blockchain, dec!(30)).is_ok());
        // 30 already pending, 20 left
        assert!(matches!(
            send(&mut blockchain, dec!(20.5)),
            Err(BlockchainError::InsufficientFunds { available, required })
                if available == dec!(20) && required == dec!(20.5)
        ));
        assert!(send(&mut blockchain, dec!(19.5)).is_ok());
        assert!(send(&mut blockchain, dec!(0.5)).is_ok());
        assert_eq!(blockchain.pending_transactions().len(), 3);

        blockchain.mine().unwrap();
        assert_eq!(blockchain.wallet(&alice.public_key).unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_allow_negative_policy_overdraws() {
        let mut blockchain = setup_blockchain();
        let alice = blockchain.create_wallet("Alice", 10).unwrap();
        let bob = blockchain.register_wallet("Bob");

        blockchain
            .create_transaction(
                25,
                Sender::Wallet(alice.public_key.clone()),
                &bob.public_key,
                &alice.private_key,
            )
            .unwrap();
        blockchain.mine().unwrap();

        assert_eq!(blockchain.wallet(&alice.public_key).unwrap().balance, dec!(-15));
        assert_eq!(blockchain.wallet(&bob.public_key).unwrap().balance, dec!(25));
    }

    #[test]
    fn test_max_pending_caps_pool() {
        let mut config = BlockchainConfig::with_difficulty(1);
        config.max_pending = Some(2);
        let mut blockchain = Blockchain::new(config).unwrap();
        let alice = blockchain.register_wallet("Alice");

        blockchain.fund_wallet(&alice.public_key, 1).unwrap();
        blockchain.fund_wallet(&alice.public_key, 2).unwrap();
        assert!(matches!(
            blockchain.fund_wallet(&alice.public_key, 3),
            Err(BlockchainError::Mempool(MempoolError::MempoolFull(2)))
        ));
        assert_eq!(blockchain.pending_transactions().len(), 2);
    }

    #[test]
    fn test_blockchain_stats() {
        let mut blockchain = setup_blockchain();
        blockchain.create_wallet("Alice", 10).unwrap();

        let stats = blockchain.stats();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.pending_transactions, 0);
        assert_eq!(stats.wallet_count, 1);
        assert_eq!(stats.difficulty, 1);
        assert_eq!(stats.latest_block_hash, blockchain.last_block().hash);
    }
}
