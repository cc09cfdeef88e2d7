//! Engine processes, games and match scheduling.
//!
//! - [`session`]: one UCI engine process behind the [`EngineSession`] trait
//! - [`game_runner`]: plays a single game between two sessions
//! - [`scheduler`]: round-robin and gauntlet tournaments on a worker pool
//! - [`sprt`]: candidate-vs-baseline matches that stop on an SPRT decision

pub mod game_runner;
pub mod protocol;
pub mod scheduler;
pub mod session;
pub mod sprt;

pub use game_runner::GameRunner;
pub use protocol::{Command, EngineLine, PositionSpec};
pub use scheduler::{schedule, GameTicket, Pairing, ScheduleError, Tournament, TournamentReport};
pub use session::{
    EngineSession, ProcessLauncher, SearchResult, SessionError, SessionLauncher, SessionState,
    UciSession,
};
pub use sprt::{SprtMatch, SprtReport};

pub use tokio_util::sync::CancellationToken;
