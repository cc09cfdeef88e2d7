//! Core types for engine-vs-engine testing: game records, the rules adapter,
//! openings, standings, Elo estimates and the SPRT.
//!
//! Nothing in here does IO beyond reading config/opening files and writing
//! record sinks; processes and scheduling live in `arena-runner`.

pub mod arbiter;
pub mod config;
pub mod elo;
pub mod error;
pub mod game;
pub mod opening;
pub mod search;
pub mod serde_helpers;
pub mod sink;
pub mod sprt;
pub mod standings;

pub use arbiter::{Arbiter, CozyArbiter, Verdict};
pub use config::{
    EngineConfig, GameSettings, OpeningSettings, OutputSettings, RunConfig, SprtSettings,
    TournamentSettings,
};
pub use elo::{estimate_elo, expected_score, EloEstimate};
pub use error::{ConfigError, IllegalMove, OpeningError, SinkError};
pub use game::{
    AbortKind, AbortPolicy, AbortReason, GameOutcome, GameRecord, MatchOutcome, Opening,
    PlayedMove, Side, Termination,
};
pub use opening::{OpeningBook, OpeningSource, StartPosition};
pub use search::{GameClock, Score, SearchInfo, SearchLimits};
pub use sink::{JsonlSink, NullSink, RecordSink};
pub use sprt::{Sprt, SprtConfig, SprtDecision};
pub use standings::{PairTally, StandingRow, Standings};
