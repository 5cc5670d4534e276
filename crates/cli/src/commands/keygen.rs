//! Keypair generation command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use cryptochain_core::Keypair;

#[derive(Args)]
pub struct KeygenArgs {
    /// Print the keypair as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: KeygenArgs) -> Result<()> {
    let keypair = Keypair::generate();

    if args.json {
        let key_json = serde_json::json!({
            "public_key": keypair.public_key_hex(),
            "private_key": keypair.private_key_hex(),
        });
        println!("{}", serde_json::to_string_pretty(&key_json)?);
        return Ok(());
    }

    println!("{}", "Generated keypair".bold().cyan());
    println!("  Public key:  {}", keypair.public_key_hex().bright_yellow());
    println!("  Private key: {}", keypair.private_key_hex().bright_black());
    println!();
    println!("{}", "Keep the private key secret.".yellow());
    Ok(())
}
