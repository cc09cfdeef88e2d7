//! Run configuration, loaded from a TOML file.
//!
//! ```toml
//! [[engines]]
//! name = "candidate"
//! command = "./target/release/engine"
//! [engines.options]
//! Hash = "16"
//!
//! [[engines]]
//! name = "baseline"
//! command = "./bin/engine-v1"
//!
//! [game]
//! move_time_ms = 100
//!
//! [tournament]
//! games_per_pair = 16
//! concurrency = 4
//! abort_policy = "exclude"
//!
//! [sprt]
//! candidate = "candidate"
//! baseline = "baseline"
//! elo0 = 0.0
//! elo1 = 5.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, OpeningError};
use crate::game::{AbortPolicy, Side};
use crate::opening::{OpeningBook, OpeningSource, StartPosition};
use crate::search::{GameClock, SearchLimits};
use crate::sprt::SprtConfig;

/// How to launch one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Unique label used in standings and records
    pub name: String,
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// UCI options sent with `setoption` after the handshake
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl EngineConfig {
    pub fn new(name: impl Into<String>, command: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            options: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

/// Per-game settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Fixed time per move; 0 leaves the budget to `depth`/`nodes`
    pub move_time_ms: u64,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    /// Starting time on each player's clock; 0 plays without a clock
    pub clock_base_ms: u64,
    /// Added to a player's clock after each of its moves
    pub clock_increment_ms: u64,
    /// Extra time allowed past the move budget before declaring a timeout
    pub timeout_margin_ms: u64,
    /// Read deadline for searches bounded only by depth or nodes
    pub untimed_search_ms: u64,
    pub handshake_timeout_ms: u64,
    pub quit_timeout_ms: u64,
    /// How long to wait for `bestmove` after sending `stop`
    pub stop_grace_ms: u64,
    /// Adjudicate a draw after this many engine plies; 0 disables the limit
    pub max_plies: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            move_time_ms: 100,
            depth: None,
            nodes: None,
            clock_base_ms: 0,
            clock_increment_ms: 0,
            timeout_margin_ms: 1_000,
            untimed_search_ms: 60_000,
            handshake_timeout_ms: 10_000,
            quit_timeout_ms: 2_000,
            stop_grace_ms: 250,
            max_plies: 400,
        }
    }
}

impl GameSettings {
    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            move_time: (self.move_time_ms > 0).then(|| Duration::from_millis(self.move_time_ms)),
            depth: self.depth,
            nodes: self.nodes,
            clock: self.clock(),
        }
    }

    /// Fresh clocks for a new game
    pub fn clock(&self) -> Option<GameClock> {
        (self.clock_base_ms > 0).then(|| {
            GameClock::new(
                Duration::from_millis(self.clock_base_ms),
                Duration::from_millis(self.clock_increment_ms),
            )
        })
    }

    /// How long to wait for `bestmove` from `side` searching under `limits`.
    pub fn move_timeout(&self, limits: &SearchLimits, side: Side) -> Duration {
        let budget = limits
            .time_budget(side)
            .unwrap_or(Duration::from_millis(self.untimed_search_ms));
        budget + Duration::from_millis(self.timeout_margin_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn quit_timeout(&self) -> Duration {
        Duration::from_millis(self.quit_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn max_plies(&self) -> Option<u32> {
        (self.max_plies > 0).then_some(self.max_plies)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentSettings {
    /// Games per engine pair; must be even (mirrored colours)
    pub games_per_pair: u32,
    /// Maximum games in flight; 0 uses the available parallelism
    pub concurrency: usize,
    pub abort_policy: AbortPolicy,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            games_per_pair: 16,
            concurrency: 0,
            abort_policy: AbortPolicy::Exclude,
        }
    }
}

impl TournamentSettings {
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency > 0 {
            return self.concurrency;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningSettings {
    /// Opening book file; the standard start position when absent
    pub book: Option<PathBuf>,
    /// Book move lines are cut to this many plies
    pub max_plies: usize,
    /// Seed for reproducible opening draws
    pub seed: Option<u64>,
}

impl Default for OpeningSettings {
    fn default() -> Self {
        Self {
            book: None,
            max_plies: 8,
            seed: None,
        }
    }
}

impl OpeningSettings {
    pub fn source(&self) -> Result<Box<dyn OpeningSource>, OpeningError> {
        match &self.book {
            Some(path) => Ok(Box::new(OpeningBook::load(path, self.max_plies, self.seed)?)),
            None => Ok(Box::new(StartPosition)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprtSettings {
    pub candidate: Option<String>,
    pub baseline: Option<String>,
    pub elo0: f64,
    pub elo1: f64,
    pub alpha: f64,
    pub beta: f64,
    pub max_games: u32,
}

impl Default for SprtSettings {
    fn default() -> Self {
        let defaults = SprtConfig::default();
        Self {
            candidate: None,
            baseline: None,
            elo0: defaults.elo0,
            elo1: defaults.elo1,
            alpha: defaults.alpha,
            beta: defaults.beta,
            max_games: defaults.max_games,
        }
    }
}

impl SprtSettings {
    pub fn config(&self) -> SprtConfig {
        SprtConfig {
            elo0: self.elo0,
            elo1: self.elo1,
            alpha: self.alpha,
            beta: self.beta,
            max_games: self.max_games,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// JSONL file receiving every finished game
    pub records: Option<PathBuf>,
    /// JSON file receiving the run summary
    pub summary: Option<PathBuf>,
}

/// Everything a run needs. Passed by value into the scheduler; there is no
/// global configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub engines: Vec<EngineConfig>,
    #[serde(default)]
    pub game: GameSettings,
    #[serde(default)]
    pub tournament: TournamentSettings,
    #[serde(default)]
    pub openings: OpeningSettings,
    #[serde(default)]
    pub sprt: SprtSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

impl RunConfig {
    pub fn new(engines: Vec<EngineConfig>) -> Self {
        Self {
            engines,
            game: GameSettings::default(),
            tournament: TournamentSettings::default(),
            openings: OpeningSettings::default(),
            sprt: SprtSettings::default(),
            output: OutputSettings::default(),
        }
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn engine(&self, name: &str) -> Option<&EngineConfig> {
        self.engines.iter().find(|e| e.name == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.engines.len() < 2 {
            return invalid(format!(
                "at least two engines are required, got {}",
                self.engines.len()
            ));
        }
        let mut seen = HashSet::new();
        for engine in &self.engines {
            if engine.name.trim().is_empty() {
                return invalid("engine names must not be empty".to_string());
            }
            if !seen.insert(engine.name.as_str()) {
                return invalid(format!("duplicate engine name `{}`", engine.name));
            }
        }

        if self.game.limits().is_unbounded() {
            return invalid("game needs move_time_ms, clock_base_ms, depth or nodes".to_string());
        }
        if self.game.clock_increment_ms > 0 && self.game.clock_base_ms == 0 {
            return invalid("clock_increment_ms needs clock_base_ms".to_string());
        }
        let games = self.tournament.games_per_pair;
        if games == 0 || games % 2 != 0 {
            return invalid(format!(
                "games_per_pair must be a positive even number, got {}",
                games
            ));
        }

        self.sprt.config().validate().map_err(ConfigError::Invalid)?;
        for name in [&self.sprt.candidate, &self.sprt.baseline].into_iter().flatten() {
            if self.engine(name).is_none() {
                return invalid(format!("sprt engine `{}` is not configured", name));
            }
        }
        if self.sprt.candidate.is_some() && self.sprt.candidate == self.sprt.baseline {
            return invalid("sprt candidate and baseline must differ".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
