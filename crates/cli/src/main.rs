//! cryptochain CLI entry point.

use clap::Parser;
use colored::Colorize;
use tracing::Level;

mod commands;

#[derive(Parser)]
#[command(name = "cryptochain")]
#[command(about = "A proof-of-work ledger with signed transfers", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd) {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                std::process::exit(1);
            }
        }
        None => {
            println!("cryptochain - A proof-of-work ledger with signed transfers");
            println!("Run 'cryptochain --help' for usage information.");
        }
    }
}
