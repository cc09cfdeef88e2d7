//! Finished games and how they are scored from one engine's point of view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::search::SearchInfo;

/// A side of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "white"),
            Side::Black => write!(f, "black"),
        }
    }
}

impl From<cozy_chess::Color> for Side {
    fn from(color: cozy_chess::Color) -> Self {
        match color {
            cozy_chess::Color::White => Side::White,
            cozy_chess::Color::Black => Side::Black,
        }
    }
}

/// Result of a game from White's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    WhiteWin,
    BlackWin,
    Draw,
    Aborted,
}

impl GameOutcome {
    /// PGN result tag
    pub fn result_str(self) -> &'static str {
        match self {
            GameOutcome::WhiteWin => "1-0",
            GameOutcome::BlackWin => "0-1",
            GameOutcome::Draw => "1/2-1/2",
            GameOutcome::Aborted => "*",
        }
    }

    pub fn win_for(side: Side) -> Self {
        match side {
            Side::White => GameOutcome::WhiteWin,
            Side::Black => GameOutcome::BlackWin,
        }
    }
}

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    Repetition,
    FiftyMoveRule,
    /// Adjudicated as a draw after the configured number of plies
    MoveLimit,
    Abort,
}

/// Result of one game from a fixed engine's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Win,
    Draw,
    Loss,
    /// The game does not count (aborted and not credited)
    Skipped,
}

impl MatchOutcome {
    /// The same game seen from the opponent's side
    pub fn reversed(self) -> Self {
        match self {
            MatchOutcome::Win => MatchOutcome::Loss,
            MatchOutcome::Loss => MatchOutcome::Win,
            other => other,
        }
    }

    /// Points in half-point units (2 for a win, 1 for a draw)
    pub fn half_points(self) -> u32 {
        match self {
            MatchOutcome::Win => 2,
            MatchOutcome::Draw => 1,
            MatchOutcome::Loss | MatchOutcome::Skipped => 0,
        }
    }
}

/// What went wrong in an aborted game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortKind {
    /// The opening handed to the game was not a legal position/sequence
    InvalidOpening,
    EngineLaunchFailed,
    HandshakeFailed,
    IllegalMove,
    SearchTimeout,
    /// The engine answered after its game clock ran out
    TimeForfeit,
    EngineCrashed,
    /// Overlapping commands on one session; a runner bug, not an engine fault
    ProtocolViolation,
}

impl AbortKind {
    /// Whether the offending engine can be blamed for the abort. Launch
    /// failures and bad openings are environment problems, and protocol
    /// violations come from the runner.
    pub fn is_engine_fault(self) -> bool {
        matches!(
            self,
            AbortKind::HandshakeFailed
                | AbortKind::IllegalMove
                | AbortKind::SearchTimeout
                | AbortKind::TimeForfeit
                | AbortKind::EngineCrashed
        )
    }
}

impl fmt::Display for AbortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AbortKind::InvalidOpening => "invalid opening",
            AbortKind::EngineLaunchFailed => "engine launch failed",
            AbortKind::HandshakeFailed => "handshake failed",
            AbortKind::IllegalMove => "illegal move",
            AbortKind::SearchTimeout => "search timeout",
            AbortKind::TimeForfeit => "time forfeit",
            AbortKind::EngineCrashed => "engine crashed",
            AbortKind::ProtocolViolation => "protocol violation",
        };
        f.write_str(text)
    }
}

/// The reason tag stored on an aborted game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind} by {engine} ({side}) at move {move_number}: {detail}")]
pub struct AbortReason {
    pub kind: AbortKind,
    /// Name of the engine that caused the abort
    pub engine: String,
    pub side: Side,
    /// Full-move number (as in PGN) at which the abort happened
    pub move_number: u32,
    pub detail: String,
}

/// How aborted games are scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbortPolicy {
    /// Aborted games are not credited to anyone
    #[default]
    Exclude,
    /// An abort the engine is responsible for counts as a loss for it
    LossForOffender,
}

/// Where a game starts: a FEN (or the standard start position) plus an
/// optional prefix of UCI moves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opening {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moves: Vec<String>,
}

impl Opening {
    pub fn startpos() -> Self {
        Self::default()
    }

    pub fn from_moves<I, S>(moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fen: None,
            moves: moves.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_fen(fen: impl Into<String>) -> Self {
        Self {
            fen: Some(fen.into()),
            moves: Vec::new(),
        }
    }

    /// Short human-readable description for logs
    pub fn label(&self) -> String {
        let base = self.fen.as_deref().unwrap_or("startpos");
        if self.moves.is_empty() {
            base.to_string()
        } else {
            format!("{} moves {}", base, self.moves.join(" "))
        }
    }
}

/// A move played by an engine, with the last diagnostics it reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedMove {
    pub uci: String,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<SearchInfo>,
}

/// A finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: Uuid,
    /// Scheduling ticket, used to restore schedule order for archival
    pub ticket: u64,
    pub white: String,
    pub black: String,
    pub opening: Opening,
    /// Moves played by the engines, after the opening prefix
    pub moves: Vec<PlayedMove>,
    pub outcome: GameOutcome,
    pub termination: Termination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<AbortReason>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl GameRecord {
    pub fn is_aborted(&self) -> bool {
        self.outcome == GameOutcome::Aborted
    }

    /// Which side `engine` played, if it took part in this game
    pub fn side_of(&self, engine: &str) -> Option<Side> {
        if self.white == engine {
            Some(Side::White)
        } else if self.black == engine {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn engine_on(&self, side: Side) -> &str {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// Score this game from `engine`'s point of view.
    pub fn outcome_for(&self, engine: &str, policy: AbortPolicy) -> MatchOutcome {
        let Some(side) = self.side_of(engine) else {
            return MatchOutcome::Skipped;
        };
        let winner = match self.outcome {
            GameOutcome::WhiteWin => Side::White,
            GameOutcome::BlackWin => Side::Black,
            GameOutcome::Draw => return MatchOutcome::Draw,
            GameOutcome::Aborted => match (policy, &self.abort) {
                (AbortPolicy::LossForOffender, Some(reason)) if reason.kind.is_engine_fault() => {
                    reason.side.opposite()
                }
                _ => return MatchOutcome::Skipped,
            },
        };
        if winner == side {
            MatchOutcome::Win
        } else {
            MatchOutcome::Loss
        }
    }

    /// Every move of the game in UCI notation, opening prefix included
    pub fn uci_moves(&self) -> impl Iterator<Item = &str> {
        self.opening
            .moves
            .iter()
            .map(String::as_str)
            .chain(self.moves.iter().map(|m| m.uci.as_str()))
    }
}

#[cfg(test)]
#[path = "game_tests.rs"]
mod game_tests;
