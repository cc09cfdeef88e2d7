//! Tournament score table and head-to-head tallies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::elo::EloEstimate;
use crate::game::{AbortPolicy, GameRecord, MatchOutcome};

/// Head-to-head record from one engine's perspective
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairTally {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl PairTally {
    pub fn total_games(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    /// Points scored (1 for a win, 0.5 for a draw)
    pub fn points(&self) -> f64 {
        self.wins as f64 + 0.5 * self.draws as f64
    }

    /// Score fraction (0.5 when no games were played)
    pub fn score(&self) -> f64 {
        let total = self.total_games();
        if total == 0 {
            return 0.5;
        }
        self.points() / total as f64
    }

    pub fn elo(&self) -> EloEstimate {
        EloEstimate::from_record(self.wins, self.draws, self.losses)
    }

    fn add(&mut self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Win => self.wins += 1,
            MatchOutcome::Loss => self.losses += 1,
            MatchOutcome::Draw => self.draws += 1,
            MatchOutcome::Skipped => {}
        }
    }
}

/// One row of the final table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub engine: String,
    pub points: f64,
    pub games: u32,
}

/// Score table plus head-to-head matrix, updated one finished game at a time.
///
/// Everything is kept as integer counters (points in half-point units), so
/// replaying the same set of games in any order gives an identical table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    half_points: BTreeMap<String, u32>,
    head_to_head: BTreeMap<String, BTreeMap<String, PairTally>>,
    completed: u32,
    aborted: u32,
}

impl Standings {
    /// Start a table listing every participant, even before they score.
    pub fn new<I, S>(engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut standings = Self::default();
        for engine in engines {
            standings.half_points.entry(engine.into()).or_insert(0);
        }
        standings
    }

    /// Fold one finished game into the table.
    pub fn record(&mut self, game: &GameRecord, policy: AbortPolicy) {
        if game.is_aborted() {
            self.aborted += 1;
        } else {
            self.completed += 1;
        }
        self.half_points.entry(game.white.clone()).or_insert(0);
        self.half_points.entry(game.black.clone()).or_insert(0);

        let white = game.outcome_for(&game.white, policy);
        if white == MatchOutcome::Skipped {
            return;
        }
        self.credit(&game.white, &game.black, white);
        self.credit(&game.black, &game.white, white.reversed());
    }

    fn credit(&mut self, engine: &str, opponent: &str, outcome: MatchOutcome) {
        *self.half_points.entry(engine.to_string()).or_insert(0) += outcome.half_points();
        self.head_to_head
            .entry(engine.to_string())
            .or_default()
            .entry(opponent.to_string())
            .or_default()
            .add(outcome);
    }

    /// Total points of an engine
    pub fn score(&self, engine: &str) -> f64 {
        f64::from(self.half_points.get(engine).copied().unwrap_or(0)) / 2.0
    }

    /// Record of `engine` against `opponent`
    pub fn pair(&self, engine: &str, opponent: &str) -> PairTally {
        self.head_to_head
            .get(engine)
            .and_then(|row| row.get(opponent))
            .copied()
            .unwrap_or_default()
    }

    /// Counted games of an engine across all opponents
    pub fn games(&self, engine: &str) -> u32 {
        self.head_to_head
            .get(engine)
            .map(|row| row.values().map(PairTally::total_games).sum())
            .unwrap_or(0)
    }

    pub fn engines(&self) -> impl Iterator<Item = &str> {
        self.half_points.keys().map(String::as_str)
    }

    /// Engines sorted by points, best first (ties broken by name)
    pub fn ranking(&self) -> Vec<StandingRow> {
        let mut rows: Vec<_> = self
            .engines()
            .map(|engine| StandingRow {
                engine: engine.to_string(),
                points: self.score(engine),
                games: self.games(engine),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.points
                .partial_cmp(&a.points)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.engine.cmp(&b.engine))
        });
        rows
    }

    /// Games that reached a result
    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn aborted(&self) -> u32 {
        self.aborted
    }
}

#[cfg(test)]
#[path = "standings_tests.rs"]
mod standings_tests;
