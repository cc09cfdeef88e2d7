//! Error types shared by the arena crates.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum OpeningError {
    #[error("failed to read opening book {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("opening book line {line}: {detail}")]
    Parse { line: usize, detail: String },

    #[error("opening book {0} contains no openings")]
    Empty(PathBuf),

    #[error("invalid opening: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("record sink io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode game record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A move the rules adapter refused to play.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal move `{mv}` in position {fen}")]
pub struct IllegalMove {
    pub mv: String,
    pub fen: String,
}
