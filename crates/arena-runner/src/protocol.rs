//! UCI wire format: commands we send and the lines engines send back.

use std::fmt;

use arena_core::{Opening, Score, SearchInfo, SearchLimits};

/// A position as sent with `position`: a base (start position or FEN) and the
/// moves played from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionSpec {
    pub fen: Option<String>,
    pub moves: Vec<String>,
}

impl PositionSpec {
    /// The opening's base position with its move prefix followed by `played`.
    pub fn from_opening<S: AsRef<str>>(opening: &Opening, played: &[S]) -> Self {
        let mut moves = opening.moves.clone();
        moves.extend(played.iter().map(|m| m.as_ref().to_string()));
        Self {
            fen: opening.fen.clone(),
            moves,
        }
    }
}

/// Commands sent to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Uci,
    IsReady,
    SetOption { name: String, value: String },
    UciNewGame,
    Position(PositionSpec),
    Go(SearchLimits),
    Stop,
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Uci => f.write_str("uci"),
            Command::IsReady => f.write_str("isready"),
            Command::SetOption { name, value } => {
                write!(f, "setoption name {} value {}", name, value)
            }
            Command::UciNewGame => f.write_str("ucinewgame"),
            Command::Position(spec) => {
                match &spec.fen {
                    Some(fen) => write!(f, "position fen {}", fen)?,
                    None => f.write_str("position startpos")?,
                }
                if !spec.moves.is_empty() {
                    write!(f, " moves {}", spec.moves.join(" "))?;
                }
                Ok(())
            }
            Command::Go(limits) => {
                f.write_str("go")?;
                if let Some(clock) = &limits.clock {
                    write!(
                        f,
                        " wtime {} btime {} winc {} binc {}",
                        clock.white.as_millis(),
                        clock.black.as_millis(),
                        clock.increment.as_millis(),
                        clock.increment.as_millis()
                    )?;
                }
                if let Some(time) = limits.move_time {
                    write!(f, " movetime {}", time.as_millis())?;
                }
                if let Some(depth) = limits.depth {
                    write!(f, " depth {}", depth)?;
                }
                if let Some(nodes) = limits.nodes {
                    write!(f, " nodes {}", nodes)?;
                }
                Ok(())
            }
            Command::Stop => f.write_str("stop"),
            Command::Quit => f.write_str("quit"),
        }
    }
}

/// One line of engine output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    /// `id name ...` / `id author ...`
    Id { key: String, value: String },
    UciOk,
    ReadyOk,
    Info(SearchInfo),
    BestMove { best: String, ponder: Option<String> },
    /// Anything else (option declarations, copyright banners, ...)
    Other(String),
}

impl EngineLine {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("uciok") => EngineLine::UciOk,
            Some("readyok") => EngineLine::ReadyOk,
            Some("id") => {
                let key = tokens.next().unwrap_or_default().to_string();
                let value = tokens.collect::<Vec<_>>().join(" ");
                EngineLine::Id { key, value }
            }
            Some("info") => EngineLine::Info(parse_info(tokens)),
            Some("bestmove") => match tokens.next() {
                Some(best) => {
                    let ponder = match (tokens.next(), tokens.next()) {
                        (Some("ponder"), Some(mv)) => Some(mv.to_string()),
                        _ => None,
                    };
                    EngineLine::BestMove {
                        best: best.to_string(),
                        ponder,
                    }
                }
                None => EngineLine::Other(line.to_string()),
            },
            _ => EngineLine::Other(line.to_string()),
        }
    }
}

/// Parse the tokens after `info`. Unknown keys are skipped; malformed values
/// leave their field empty.
fn parse_info<'a>(tokens: impl Iterator<Item = &'a str>) -> SearchInfo {
    let mut info = SearchInfo::default();
    let mut tokens = tokens.peekable();
    while let Some(key) = tokens.next() {
        match key {
            "depth" => info.depth = tokens.next().and_then(|v| v.parse().ok()),
            "seldepth" => info.seldepth = tokens.next().and_then(|v| v.parse().ok()),
            "nodes" => info.nodes = tokens.next().and_then(|v| v.parse().ok()),
            "nps" => info.nps = tokens.next().and_then(|v| v.parse().ok()),
            "time" => info.time_ms = tokens.next().and_then(|v| v.parse().ok()),
            "score" => {
                let kind = tokens.next();
                let value = tokens.next().and_then(|v| v.parse().ok());
                info.score = match (kind, value) {
                    (Some("cp"), Some(v)) => Some(Score::Cp(v)),
                    (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                    _ => None,
                };
                while matches!(tokens.peek(), Some(&"lowerbound") | Some(&"upperbound")) {
                    tokens.next();
                }
            }
            "pv" => {
                info.pv = tokens.by_ref().map(str::to_string).collect();
            }
            // free text runs to the end of the line
            "string" => break,
            "multipv" | "currmove" | "currmovenumber" | "hashfull" | "tbhits" | "cpuload"
            | "sbhits" => {
                tokens.next();
            }
            _ => {}
        }
    }
    info
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod protocol_tests;
