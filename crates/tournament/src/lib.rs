//! Tournament runner
//!
//! Drives round robins, gauntlets and SPRT matches between UCI engines from a
//! TOML run file, and keeps their results.
//!
//! # Usage
//!
//! ```bash
//! # Round robin between every engine in arena.toml
//! cargo run -p tournament -- run --config arena.toml
//!
//! # One challenger against the rest
//! cargo run -p tournament -- gauntlet --challenger candidate -g 20
//!
//! # Stop as soon as the candidate is shown stronger or weaker
//! cargo run -p tournament -- sprt --candidate candidate --baseline baseline
//! ```

pub mod cli;
mod commands;
mod results;

pub use commands::{check, run_sprt, run_tournament};
pub use results::*;
