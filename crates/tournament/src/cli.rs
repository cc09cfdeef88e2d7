//! Command-line surface. Flags override the matching fields of the run file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use arena_core::RunConfig;

#[derive(Debug, Parser)]
#[command(name = "tournament", version, about = "Engine tournaments and SPRT matches over UCI")]
pub struct Cli {
    /// Run file (TOML)
    #[arg(short, long, global = true, default_value = "arena.toml", env = "ARENA_CONFIG")]
    pub config: PathBuf,

    /// Log protocol traffic (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Round robin between every configured engine
    Run(RunArgs),
    /// One challenger against every other engine
    Gauntlet {
        /// Name of the challenging engine
        #[arg(long)]
        challenger: String,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Candidate against baseline until the SPRT decides
    Sprt(SprtArgs),
    /// Validate the run file and opening book without playing
    Check,
}

/// Overrides shared by every playing command
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Games per engine pair (even)
    #[arg(short, long)]
    pub games_per_pair: Option<u32>,

    /// Games in flight at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Milliseconds per move
    #[arg(long)]
    pub move_time: Option<u64>,

    /// Milliseconds on each player's clock; 0 plays without a clock
    #[arg(long)]
    pub clock: Option<u64>,

    /// Milliseconds added to the clock after every move
    #[arg(long)]
    pub increment: Option<u64>,

    /// Opening book file
    #[arg(long)]
    pub book: Option<PathBuf>,

    /// Seed for opening draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSONL file receiving every game
    #[arg(long)]
    pub records: Option<PathBuf>,

    /// JSON file receiving the summary
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(games) = self.games_per_pair {
            config.tournament.games_per_pair = games;
        }
        if let Some(concurrency) = self.concurrency {
            config.tournament.concurrency = concurrency;
        }
        if let Some(ms) = self.move_time {
            config.game.move_time_ms = ms;
        }
        if let Some(ms) = self.clock {
            config.game.clock_base_ms = ms;
        }
        if let Some(ms) = self.increment {
            config.game.clock_increment_ms = ms;
        }
        if let Some(book) = &self.book {
            config.openings.book = Some(book.clone());
        }
        if self.seed.is_some() {
            config.openings.seed = self.seed;
        }
        if let Some(records) = &self.records {
            config.output.records = Some(records.clone());
        }
        if let Some(summary) = &self.summary {
            config.output.summary = Some(summary.clone());
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct SprtArgs {
    #[arg(long)]
    pub candidate: Option<String>,

    #[arg(long)]
    pub baseline: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub elo0: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub elo1: Option<f64>,

    #[arg(long)]
    pub alpha: Option<f64>,

    #[arg(long)]
    pub beta: Option<f64>,

    #[arg(long)]
    pub max_games: Option<u32>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl SprtArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        self.run.apply(config);
        let sprt = &mut config.sprt;
        if self.candidate.is_some() {
            sprt.candidate = self.candidate.clone();
        }
        if self.baseline.is_some() {
            sprt.baseline = self.baseline.clone();
        }
        if let Some(v) = self.elo0 {
            sprt.elo0 = v;
        }
        if let Some(v) = self.elo1 {
            sprt.elo1 = v;
        }
        if let Some(v) = self.alpha {
            sprt.alpha = v;
        }
        if let Some(v) = self.beta {
            sprt.beta = v;
        }
        if let Some(v) = self.max_games {
            sprt.max_games = v;
        }
    }
}

impl Cli {
    /// Load the run file, apply this command's overrides and validate the
    /// result.
    pub fn load_config(&self) -> Result<RunConfig> {
        let mut config = RunConfig::load(&self.config)
            .with_context(|| format!("loading run file {}", self.config.display()))?;
        match &self.command {
            Command::Run(run) | Command::Gauntlet { run, .. } => run.apply(&mut config),
            Command::Sprt(args) => args.apply(&mut config),
            Command::Check => {}
        }
        config.validate().context("command-line overrides")?;
        if let Command::Sprt(_) = &self.command {
            if config.sprt.candidate.is_none() || config.sprt.baseline.is_none() {
                bail!("sprt needs a candidate and a baseline (run file [sprt] or --candidate/--baseline)");
            }
        }
        Ok(config)
    }

    /// Default log filter when RUST_LOG is unset
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod cli_tests;
