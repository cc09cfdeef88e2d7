//! Tournament CLI

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use arena_runner::{CancellationToken, Pairing, ProcessLauncher};
use tournament::cli::{Cli, Command};
use tournament::{check, run_sprt, run_tournament};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.load_config()?;

    // First Ctrl-C stops dispatching; games in flight still finish.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing games in flight");
                cancel.cancel();
            }
        });
    }

    let launcher = Arc::new(ProcessLauncher);
    match cli.command {
        Command::Run(_) => {
            let results = run_tournament(&config, Pairing::RoundRobin, launcher, cancel).await?;
            results.print_report();
        }
        Command::Gauntlet { challenger, .. } => {
            let results =
                run_tournament(&config, Pairing::Gauntlet { challenger }, launcher, cancel).await?;
            results.print_report();
        }
        Command::Sprt(_) => {
            let results = run_sprt(&config, launcher, cancel).await?;
            results.print_report();
        }
        Command::Check => {
            println!("{}", check(&config)?);
        }
    }
    Ok(())
}
