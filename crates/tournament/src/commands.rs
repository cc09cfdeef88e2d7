//! The playing commands, independent of argument parsing.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use arena_core::{JsonlSink, NullSink, OutputSettings, RecordSink, RunConfig};
use arena_runner::{
    CancellationToken, GameRunner, Pairing, SessionLauncher, SprtMatch, Tournament,
};

use crate::results::{SprtResults, TournamentResults};

fn open_sink(output: &OutputSettings) -> Result<Box<dyn RecordSink>> {
    match &output.records {
        Some(path) => {
            let sink = JsonlSink::create(path)
                .with_context(|| format!("opening record file {}", path.display()))?;
            tracing::info!(path = %path.display(), "writing game records");
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(NullSink)),
    }
}

/// Play a round robin or gauntlet and save the summary if configured.
pub async fn run_tournament(
    config: &RunConfig,
    pairing: Pairing,
    launcher: Arc<dyn SessionLauncher>,
    cancel: CancellationToken,
) -> Result<TournamentResults> {
    let name = match &pairing {
        Pairing::RoundRobin => "round robin".to_string(),
        Pairing::Gauntlet { challenger } => format!("gauntlet: {}", challenger),
    };
    let mut openings = config.openings.source().context("loading openings")?;
    let runner = GameRunner::new(launcher, config.game.clone());
    let tournament = Tournament::new(config.engines.clone(), runner, &config.tournament)
        .with_cancellation(cancel);
    let games_per_pair = config.tournament.games_per_pair;
    let tickets = tournament
        .schedule(&pairing, games_per_pair, openings.as_mut())
        .context("scheduling games")?;

    let mut sink = open_sink(&config.output)?;
    let started_at = Utc::now();
    let report = tournament.run(tickets, sink.as_mut()).await;

    let results =
        TournamentResults::from_report(&name, started_at, &report, games_per_pair, &config.game);
    if let Some(path) = &config.output.summary {
        results
            .save(path)
            .with_context(|| format!("saving summary {}", path.display()))?;
    }
    Ok(results)
}

/// Play candidate against baseline until the SPRT decides.
pub async fn run_sprt(
    config: &RunConfig,
    launcher: Arc<dyn SessionLauncher>,
    cancel: CancellationToken,
) -> Result<SprtResults> {
    let engine = |name: &Option<String>, role: &str| {
        name.as_deref()
            .and_then(|n| config.engine(n))
            .cloned()
            .with_context(|| format!("no {} engine configured for sprt", role))
    };
    let candidate = engine(&config.sprt.candidate, "candidate")?;
    let baseline = engine(&config.sprt.baseline, "baseline")?;

    let mut openings = config.openings.source().context("loading openings")?;
    let runner = GameRunner::new(launcher, config.game.clone());
    let sprt = SprtMatch::new(candidate, baseline, runner, &config.tournament)
        .with_cancellation(cancel);

    let mut sink = open_sink(&config.output)?;
    let started_at = Utc::now();
    let report = sprt
        .run(config.sprt.config(), openings.as_mut(), sink.as_mut())
        .await;

    let results = SprtResults::from_report(started_at, &report);
    if let Some(path) = &config.output.summary {
        results
            .save(path)
            .with_context(|| format!("saving summary {}", path.display()))?;
    }
    Ok(results)
}

/// Validate everything a run would need and describe what it would play.
pub fn check(config: &RunConfig) -> Result<String> {
    let mut openings = config.openings.source().context("loading openings")?;
    let tickets = arena_runner::schedule(
        &config.engines,
        &Pairing::RoundRobin,
        config.tournament.games_per_pair,
        openings.as_mut(),
    )
    .context("scheduling games")?;

    let names: Vec<&str> = config.engines.iter().map(|e| e.name.as_str()).collect();
    let mut text = format!(
        "{} engines ({}), {} games per pair, {} games in a round robin",
        names.len(),
        names.join(", "),
        config.tournament.games_per_pair,
        tickets.len()
    );
    if let (Some(candidate), Some(baseline)) = (&config.sprt.candidate, &config.sprt.baseline) {
        let (lower, upper) = config.sprt.config().bounds();
        text.push_str(&format!(
            "\nsprt {} vs {}: LLR bounds [{:.3}, {:.3}], at most {} games",
            candidate, baseline, lower, upper, config.sprt.max_games
        ));
    }
    Ok(text)
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod commands_tests;
