//! Merkle root command.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use cryptochain_core::{
    verify_proof, HmacSha256Hasher, MerkleTree, Transaction, DEFAULT_HASH_KEY,
};
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct MerkleArgs {
    /// JSON file holding an array of transactions
    file: PathBuf,

    /// Key for the HMAC hash
    #[arg(long, default_value = DEFAULT_HASH_KEY)]
    key: String,

    /// Also print an inclusion proof for the transaction at this index
    #[arg(long)]
    proof: Option<usize>,
}

pub fn run(args: MerkleArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let transactions: Vec<Transaction> =
        serde_json::from_str(&raw).with_context(|| "Failed to parse transaction list")?;

    let hasher = HmacSha256Hasher::new(&args.key);
    let tree = MerkleTree::new(&hasher, &transactions);

    println!("Transactions: {}", tree.leaf_count().to_string().bright_cyan());
    println!("Merkle root:  {}", tree.root().bright_yellow());

    if let Some(index) = args.proof {
        let Some(proof) = tree.proof(index) else {
            bail!(
                "No transaction at index {} ({} in file)",
                index,
                transactions.len()
            );
        };

        println!();
        println!("{}", format!("Proof for transaction {}", index).bold());
        println!("  Leaf: {}", proof.leaf);
        for (sibling, is_right) in proof.siblings.iter().zip(&proof.directions) {
            let side = if *is_right { "right" } else { "left " };
            println!("  {} {}", side.bright_black(), sibling);
        }

        if verify_proof(&hasher, tree.root(), &proof) {
            println!("{}  Proof verifies", "✓".green().bold());
        } else {
            bail!("Proof does not verify against the root");
        }
    }

    Ok(())
}
