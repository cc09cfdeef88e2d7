//! Search budgets sent to engines and the diagnostics they report back.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::Side;

/// Limits for a single `go` command.
///
/// Engines are expected to stop at whichever limit is hit first. A search
/// with no limit at all would be `go infinite`, which the runner never sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchLimits {
    /// Fixed time for this move (`go movetime`)
    pub move_time: Option<Duration>,
    /// Maximum search depth in plies (`go depth`)
    pub depth: Option<u32>,
    /// Maximum number of nodes (`go nodes`)
    pub nodes: Option<u64>,
    /// Both clocks (`go wtime btime winc binc`)
    pub clock: Option<GameClock>,
}

impl SearchLimits {
    /// Create limits with only a depth constraint.
    pub fn depth(depth: u32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    /// Create limits with only a time constraint.
    pub fn time(move_time: Duration) -> Self {
        Self {
            move_time: Some(move_time),
            ..Self::default()
        }
    }

    /// Create limits with both depth and time constraints.
    pub fn depth_and_time(depth: u32, move_time: Duration) -> Self {
        Self {
            move_time: Some(move_time),
            depth: Some(depth),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_nodes(mut self, nodes: u64) -> Self {
        self.nodes = Some(nodes);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: GameClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.move_time.is_none()
            && self.depth.is_none()
            && self.nodes.is_none()
            && self.clock.is_none()
    }

    /// Wall time `side` may spend on this move: the move time capped by its
    /// remaining clock. `None` when only depth or nodes bound the search.
    pub fn time_budget(&self, side: Side) -> Option<Duration> {
        let remaining = self.clock.map(|clock| clock.remaining(side));
        match (self.move_time, remaining) {
            (Some(move_time), Some(remaining)) => Some(move_time.min(remaining)),
            (move_time, remaining) => move_time.or(remaining),
        }
    }
}

/// Remaining time of both players under a base-plus-increment control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameClock {
    pub white: Duration,
    pub black: Duration,
    /// Added after every move made in time
    pub increment: Duration,
}

impl GameClock {
    pub fn new(base: Duration, increment: Duration) -> Self {
        Self {
            white: base,
            black: base,
            increment,
        }
    }

    pub fn remaining(&self, side: Side) -> Duration {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    /// Deduct a move's thinking time from `side` and add the increment.
    /// Returns false when the flag fell; that clock is left at zero.
    pub fn charge(&mut self, side: Side, elapsed: Duration) -> bool {
        let clock = match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        };
        match clock.checked_sub(elapsed) {
            Some(left) => {
                *clock = left + self.increment;
                true
            }
            None => {
                *clock = Duration::ZERO;
                false
            }
        }
    }
}

/// Evaluation reported in an `info` line, from the engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// Centipawns
    Cp(i32),
    /// Mate in N moves (negative when the engine is getting mated)
    Mate(i32),
}

/// One parsed `info` line. Every field is optional because engines report
/// whatever subset they like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seldepth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nps: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pv: Vec<String>,
}

impl SearchInfo {
    /// Lines like `info string ...` or `info currmove ...` carry nothing we keep.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
