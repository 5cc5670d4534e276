//! In-memory ledger simulation command.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use cryptochain_chain::{BlockchainConfig, SharedBlockchain};
use cryptochain_core::{parse_amount, Block, Decimal, Sender, Wallet};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Args)]
pub struct SimulateArgs {
    /// Wallet to create, as NAME=BALANCE (repeatable)
    #[arg(short, long = "wallet", value_parser = parse_wallet)]
    wallets: Vec<(String, Decimal)>,

    /// Transfer to submit after funding, as FROM:TO:AMOUNT (repeatable)
    #[arg(short, long = "transfer", value_parser = parse_transfer)]
    transfers: Vec<Transfer>,

    /// Leading zero hex characters required in a block hash
    #[arg(short, long)]
    difficulty: Option<u32>,

    /// JSON ledger configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Transfer {
    from: String,
    to: String,
    amount: Decimal,
}

fn parse_wallet(s: &str) -> Result<(String, Decimal), String> {
    let (name, balance) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=BALANCE, got '{}'", s))?;
    if name.is_empty() {
        return Err("wallet name must not be empty".to_string());
    }
    let balance =
        parse_amount(balance).map_err(|e| format!("invalid balance '{}': {}", balance, e))?;
    if balance.is_sign_negative() {
        return Err(format!("balance must not be negative, got {}", balance));
    }
    Ok((name.to_string(), balance))
}

fn parse_transfer(s: &str) -> Result<Transfer, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [from, to, amount] = parts.as_slice() else {
        return Err(format!("expected FROM:TO:AMOUNT, got '{}'", s));
    };
    let amount =
        parse_amount(amount).map_err(|e| format!("invalid amount '{}': {}", amount, e))?;
    Ok(Transfer {
        from: from.to_string(),
        to: to.to_string(),
        amount,
    })
}

fn load_config(args: &SimulateArgs) -> Result<BlockchainConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            BlockchainConfig::from_json(&raw).with_context(|| "Invalid ledger config")?
        }
        None => BlockchainConfig::default(),
    };
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
        config.validate().with_context(|| "Invalid difficulty")?;
    }
    Ok(config)
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let config = load_config(&args)?;
    let (wallet_specs, transfers) = if args.wallets.is_empty() {
        (
            vec![
                ("Alice".to_string(), Decimal::from(100)),
                ("Bob".to_string(), Decimal::ZERO),
            ],
            vec![Transfer {
                from: "Alice".to_string(),
                to: "Bob".to_string(),
                amount: Decimal::from(30),
            }],
        )
    } else {
        (args.wallets, args.transfers)
    };

    println!(
        "{} (difficulty {})",
        "Starting cryptochain simulation...".bold().cyan(),
        config.difficulty.to_string().bright_cyan()
    );
    println!();

    let chain = SharedBlockchain::new(config).with_context(|| "Failed to create ledger")?;

    let mut wallets: HashMap<String, Wallet> = HashMap::new();
    for (name, balance) in &wallet_specs {
        let wallet = chain.create_wallet(name, *balance)?;
        println!(
            "{}  Created wallet {} ({})",
            "✓".green().bold(),
            name.bold(),
            short_key(&wallet.public_key).bright_yellow()
        );
        wallets.insert(name.clone(), wallet);
    }
    mine_next(&chain)?;

    for transfer in &transfers {
        let from = wallets
            .get(&transfer.from)
            .ok_or_else(|| anyhow!("Unknown wallet: {}", transfer.from))?;
        let to = wallets
            .get(&transfer.to)
            .ok_or_else(|| anyhow!("Unknown wallet: {}", transfer.to))?;

        match chain.create_transaction(
            transfer.amount,
            Sender::Wallet(from.public_key.clone()),
            &to.public_key,
            &from.private_key,
        ) {
            Ok(tx) => println!(
                "{}  {} -> {}: {} ({})",
                "✓".green().bold(),
                transfer.from,
                transfer.to,
                transfer.amount.to_string().bright_cyan(),
                tx.txn_id.bright_black()
            ),
            Err(e) => println!(
                "{}  {} -> {}: {} rejected: {}",
                "✗".red().bold(),
                transfer.from,
                transfer.to,
                transfer.amount,
                e
            ),
        }
    }
    mine_next(&chain)?;

    print_balances(&chain, &wallet_specs);
    print_chain(&chain)?;
    Ok(())
}

/// Mine whatever is pending on a worker thread, showing a progress line.
fn mine_next(chain: &SharedBlockchain) -> Result<()> {
    let Some(session) = chain.start_mining()? else {
        return Ok(());
    };

    let index = session.index();
    let count = session.transactions().len();
    tracing::info!(index, transactions = count, "mining in background");

    let mut stdout = io::stdout();
    while !session.is_finished() {
        if let Some(nonce) = session.latest_progress() {
            print!("\r  Mining block {} ... nonce {}", index, nonce);
            stdout.flush()?;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let block = session.finish().with_context(|| format!("Failed to mine block {}", index))?;
    println!(
        "\r{}  Mined block {} with {} transaction(s), nonce {}",
        "✓".green().bold(),
        block.index.to_string().bright_cyan(),
        count,
        block.nonce
    );
    Ok(())
}

fn print_balances(chain: &SharedBlockchain, wallet_specs: &[(String, Decimal)]) {
    let ledger = chain.lock();

    println!();
    println!("{}", "Balances".bold());
    for (name, _) in wallet_specs {
        if let Some(wallet) = ledger.wallets().iter().find(|w| &w.name == name) {
            let balance = if wallet.balance.is_sign_negative() {
                wallet.balance.to_string().red()
            } else {
                wallet.balance.to_string().green()
            };
            println!("  {:<12} {}", wallet.name, balance);
        }
    }
}

fn print_chain(chain: &SharedBlockchain) -> Result<()> {
    let ledger = chain.lock();

    println!();
    println!("{}", "Chain".bold());
    for block in ledger.chain() {
        print_block(block);
    }

    ledger.validate_chain().with_context(|| "Chain failed validation")?;
    println!();
    println!("{}", "Chain is valid.".green().bold());
    Ok(())
}

fn print_block(block: &Block) {
    println!(
        "  #{} {} prev {} nonce {} txs {}",
        block.index.to_string().bright_cyan(),
        block.hash.bright_yellow(),
        short_key(&block.prev_hash).bright_black(),
        block.nonce,
        block.tx_count()
    );
}

fn short_key(key: &str) -> &str {
    &key[..key.len().min(16)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_wallet() {
        assert_eq!(parse_wallet("Alice=100").unwrap(), ("Alice".to_string(), dec!(100)));
        assert_eq!(parse_wallet("Bob=12.5").unwrap(), ("Bob".to_string(), dec!(12.5)));
        assert!(parse_wallet("Alice").is_err());
        assert!(parse_wallet("=5").is_err());
        assert!(parse_wallet("Alice=-5").is_err());
    }

    #[test]
    fn test_parse_transfer() {
        assert_eq!(
            parse_transfer("Alice:Bob:30").unwrap(),
            Transfer {
                from: "Alice".to_string(),
                to: "Bob".to_string(),
                amount: dec!(30),
            }
        );
        assert_eq!(parse_transfer("Alice:Bob:12.50").unwrap().amount, dec!(12.5));
        assert!(parse_transfer("Alice:Bob").is_err());
        assert!(parse_transfer("Alice:Bob:x").is_err());
        assert!(parse_transfer("a:b:c:1").is_err());
    }
}
