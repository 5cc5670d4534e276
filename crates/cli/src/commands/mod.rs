//! CLI commands module.

use anyhow::Result;
use clap::Subcommand;

mod keygen;
mod merkle;
mod simulate;

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a secp256k1 keypair
    Keygen(keygen::KeygenArgs),
    /// Run an in-memory ledger: fund wallets, transfer, mine
    Simulate(simulate::SimulateArgs),
    /// Compute the merkle root of a JSON transaction list
    Merkle(merkle::MerkleArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Keygen(args) => keygen::run(args),
        Commands::Simulate(args) => simulate::run(args),
        Commands::Merkle(args) => merkle::run(args),
    }
}
