//! Opening positions used to diversify game starts.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

use crate::arbiter::CozyArbiter;
use crate::error::OpeningError;
use crate::game::Opening;

/// Supplies starting positions to the scheduler, one draw per mirrored pair.
pub trait OpeningSource: Send {
    fn next_opening(&mut self) -> Opening;
}

/// Every game starts from the standard initial position.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartPosition;

impl OpeningSource for StartPosition {
    fn next_opening(&mut self) -> Opening {
        Opening::startpos()
    }
}

/// A curated list of openings, drawn at random.
///
/// The text format has one opening per line, either an EPD/FEN line (anything
/// after the first `;` is ignored) or a whitespace-separated list of UCI moves
/// from the start position. Blank lines and `#` comments are skipped.
#[derive(Debug, Clone)]
pub struct OpeningBook {
    openings: Vec<Opening>,
    rng: StdRng,
}

impl OpeningBook {
    pub fn new(openings: Vec<Opening>, seed: Option<u64>) -> Result<Self, OpeningError> {
        if openings.is_empty() {
            return Err(OpeningError::Invalid("opening book is empty".to_string()));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { openings, rng })
    }

    /// Load a book from disk, truncating move lists to `max_plies`.
    pub fn load(path: &Path, max_plies: usize, seed: Option<u64>) -> Result<Self, OpeningError> {
        let text = std::fs::read_to_string(path).map_err(|source| OpeningError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let openings = Self::parse(&text, max_plies)?;
        if openings.is_empty() {
            return Err(OpeningError::Empty(path.to_path_buf()));
        }
        tracing::info!(path = %path.display(), openings = openings.len(), "loaded opening book");
        Self::new(openings, seed)
    }

    /// Parse book text. Every entry is checked against the rules adapter so a
    /// bad line is reported with its line number instead of aborting games.
    pub fn parse(text: &str, max_plies: usize) -> Result<Vec<Opening>, OpeningError> {
        let mut openings = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let opening = if line.contains('/') {
                Opening::from_fen(epd_to_fen(line))
            } else {
                Opening::from_moves(line.split_whitespace().take(max_plies))
            };
            CozyArbiter::new(&opening).map_err(|e| OpeningError::Parse {
                line: idx + 1,
                detail: e.to_string(),
            })?;
            openings.push(opening);
        }
        Ok(openings)
    }

    pub fn len(&self) -> usize {
        self.openings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.openings.is_empty()
    }
}

impl OpeningSource for OpeningBook {
    fn next_opening(&mut self) -> Opening {
        self.openings
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default()
    }
}

/// EPD lines carry four FEN fields followed by opcodes; FEN lines carry six.
fn epd_to_fen(line: &str) -> String {
    let position = line.split(';').next().unwrap_or(line);
    let fields: Vec<&str> = position.split_whitespace().collect();
    let mut fen: Vec<&str> = fields.iter().take(4).copied().collect();
    let counters: Vec<&str> = fields
        .iter()
        .skip(4)
        .take(2)
        .copied()
        .filter(|f| f.parse::<u32>().is_ok())
        .collect();
    if counters.len() == 2 {
        fen.extend(counters);
    } else {
        fen.extend(["0", "1"]);
    }
    fen.join(" ")
}

#[cfg(test)]
#[path = "opening_tests.rs"]
mod opening_tests;
