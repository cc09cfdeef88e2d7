//! Run summaries: saved as pretty JSON and rendered as text reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

use arena_core::serde_helpers::lenient_f64;
use arena_core::{EloEstimate, GameSettings, PairTally, SprtConfig, SprtDecision, StandingRow};
use arena_runner::{SprtReport, TournamentReport};

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid results json: {0}")]
    Json(#[from] serde_json::Error),
}

fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<(), ResultsError> {
    let io = |source: std::io::Error| ResultsError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(io)
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ResultsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ResultsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

/// Head-to-head record of one engine pair, from `engine1`'s side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub engine1: String,
    pub engine2: String,
    pub result: PairTally,
    pub elo: EloEstimate,
}

/// Summary of a tournament run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentResults {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub participants: Vec<String>,
    pub standings: Vec<StandingRow>,
    pub matches: Vec<MatchEntry>,
    pub games_per_pair: u32,
    pub game: GameSettings,
    pub completed: u32,
    pub aborted: u32,
    pub skipped: usize,
    /// Game tasks that died without a record
    #[serde(default)]
    pub lost: usize,
    pub sink_failures: usize,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

impl TournamentResults {
    pub fn from_report(
        name: &str,
        started_at: DateTime<Utc>,
        report: &TournamentReport,
        games_per_pair: u32,
        game: &GameSettings,
    ) -> Self {
        let participants: Vec<String> = report.standings.engines().map(str::to_string).collect();
        let mut matches = Vec::new();
        for (i, a) in participants.iter().enumerate() {
            for b in &participants[i + 1..] {
                let result = report.standings.pair(a, b);
                if result.total_games() == 0 {
                    continue;
                }
                matches.push(MatchEntry {
                    engine1: a.clone(),
                    engine2: b.clone(),
                    result,
                    elo: result.elo(),
                });
            }
        }

        Self {
            name: name.to_string(),
            started_at,
            participants,
            standings: report.standings.ranking(),
            matches,
            games_per_pair,
            game: game.clone(),
            completed: report.completed(),
            aborted: report.aborted(),
            skipped: report.skipped,
            lost: report.lost,
            sink_failures: report.sink_failures,
            cancelled: report.cancelled,
            elapsed_secs: report.elapsed.as_secs_f64(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ResultsError> {
        save_json(self, path)
    }

    pub fn load(path: &Path) -> Result<Self, ResultsError> {
        load_json(path)
    }

    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== Tournament: {} ===\n", self.name);
        let _ = writeln!(report, "Participants: {}", self.participants.join(", "));
        let _ = writeln!(
            report,
            "Config: {} games/pair, {}\n",
            self.games_per_pair,
            describe_limits(&self.game)
        );

        let _ = writeln!(report, "Standings:");
        let _ = writeln!(report, "{:>3}  {:<20} {:>7} {:>6}", "#", "Engine", "Points", "Games");
        report.push_str(&"-".repeat(40));
        report.push('\n');
        for (rank, row) in self.standings.iter().enumerate() {
            let _ = writeln!(
                report,
                "{:>3}  {:<20} {:>7.1} {:>6}",
                rank + 1,
                row.engine,
                row.points,
                row.games
            );
        }

        if !self.matches.is_empty() {
            let _ = writeln!(report, "\nHead to head:");
            let _ = writeln!(
                report,
                "{:<20} vs {:<20} {:>5}-{:<5}-{:<5} {:>18}",
                "Engine 1", "Engine 2", "W", "L", "D", "Elo"
            );
            report.push_str(&"-".repeat(80));
            report.push('\n');
            for entry in &self.matches {
                let _ = writeln!(
                    report,
                    "{:<20} vs {:<20} {:>5}-{:<5}-{:<5} {:>18}",
                    entry.engine1,
                    entry.engine2,
                    entry.result.wins,
                    entry.result.losses,
                    entry.result.draws,
                    entry.elo.to_string()
                );
            }
        }

        let _ = writeln!(
            report,
            "\nGames: {} completed, {} aborted, {} skipped ({:.1}s)",
            self.completed, self.aborted, self.skipped, self.elapsed_secs
        );
        if self.lost > 0 {
            let _ = writeln!(report, "Warning: {} games never reported a result", self.lost);
        }
        if self.sink_failures > 0 {
            let _ = writeln!(report, "Warning: {} records could not be stored", self.sink_failures);
        }
        if self.cancelled {
            let _ = writeln!(report, "Run was cancelled before all games were played");
        }
        report
    }

    pub fn print_report(&self) {
        println!("{}", self.generate_report());
    }
}

/// Summary of an SPRT match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprtResults {
    pub candidate: String,
    pub baseline: String,
    pub started_at: DateTime<Utc>,
    pub config: SprtConfig,
    pub decision: SprtDecision,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    /// Aborted games, whether the policy skipped them or scored them
    #[serde(default)]
    pub aborted: u32,
    pub skipped: u32,
    pub late: u32,
    #[serde(default)]
    pub lost: usize,
    #[serde(with = "lenient_f64")]
    pub llr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub elo: EloEstimate,
    pub sink_failures: usize,
    pub interrupted: bool,
    pub elapsed_secs: f64,
}

impl SprtResults {
    pub fn from_report(started_at: DateTime<Utc>, report: &SprtReport) -> Self {
        let sprt = &report.sprt;
        let (lower_bound, upper_bound) = sprt.bounds();
        Self {
            candidate: report.candidate.clone(),
            baseline: report.baseline.clone(),
            started_at,
            config: *sprt.config(),
            decision: report.decision,
            wins: sprt.wins(),
            draws: sprt.draws(),
            losses: sprt.losses(),
            aborted: report.aborted,
            skipped: sprt.skipped(),
            late: sprt.late(),
            lost: report.lost,
            llr: sprt.llr(),
            lower_bound,
            upper_bound,
            elo: sprt.elo(),
            sink_failures: report.sink_failures,
            interrupted: report.interrupted,
            elapsed_secs: report.elapsed.as_secs_f64(),
        }
    }

    pub fn games(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    pub fn save(&self, path: &Path) -> Result<(), ResultsError> {
        save_json(self, path)
    }

    pub fn load(path: &Path) -> Result<Self, ResultsError> {
        load_json(path)
    }

    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== SPRT: {} vs {} ===\n", self.candidate, self.baseline);
        let _ = writeln!(
            report,
            "H0: elo <= {}  H1: elo >= {}  alpha {}  beta {}",
            self.config.elo0, self.config.elo1, self.config.alpha, self.config.beta
        );
        let _ = writeln!(
            report,
            "Games: {} (W {} / D {} / L {}), {} aborted, {} skipped, {} late",
            self.games(),
            self.wins,
            self.draws,
            self.losses,
            self.aborted,
            self.skipped,
            self.late
        );
        if self.lost > 0 {
            let _ = writeln!(report, "Warning: {} games never reported a result", self.lost);
        }
        let _ = writeln!(
            report,
            "LLR: {:.3} in [{:.3}, {:.3}]",
            self.llr, self.lower_bound, self.upper_bound
        );
        let _ = writeln!(report, "Elo: {}", self.elo);
        let _ = writeln!(report, "Result: {}", self.decision);
        if self.interrupted {
            let _ = writeln!(report, "Run was interrupted before a decision");
        }
        if self.sink_failures > 0 {
            let _ = writeln!(report, "Warning: {} records could not be stored", self.sink_failures);
        }
        let _ = writeln!(report, "Elapsed: {:.1}s", self.elapsed_secs);
        report
    }

    pub fn print_report(&self) {
        println!("{}", self.generate_report());
    }
}

fn describe_limits(game: &GameSettings) -> String {
    let mut parts = Vec::new();
    if game.move_time_ms > 0 {
        parts.push(format!("{}ms/move", game.move_time_ms));
    }
    if game.clock_base_ms > 0 {
        parts.push(format!(
            "clock {}+{}ms",
            game.clock_base_ms, game.clock_increment_ms
        ));
    }
    if let Some(depth) = game.depth {
        parts.push(format!("depth {}", depth));
    }
    if let Some(nodes) = game.nodes {
        parts.push(format!("{} nodes", nodes));
    }
    if let Some(max) = game.max_plies() {
        parts.push(format!("max {} plies", max));
    }
    parts.join(", ")
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod results_tests;
