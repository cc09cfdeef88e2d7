//! Plays one game between two engine sessions.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::Instrument;
use uuid::Uuid;

use arena_core::{
    AbortKind, AbortReason, Arbiter, CozyArbiter, EngineConfig, GameOutcome, GameRecord,
    GameSettings, Opening, PlayedMove, Side, Termination, Verdict,
};

use crate::protocol::PositionSpec;
use crate::session::{EngineSession, SessionError, SessionLauncher};

/// A game in progress. Moves can only be appended; `finish` or `abort`
/// consumes it into the final record.
struct GameBuilder {
    id: Uuid,
    ticket: u64,
    white: String,
    black: String,
    opening: Opening,
    moves: Vec<PlayedMove>,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl GameBuilder {
    fn start(ticket: u64, white: &str, black: &str, opening: &Opening) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket,
            white: white.to_string(),
            black: black.to_string(),
            opening: opening.clone(),
            moves: Vec::new(),
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    fn push(&mut self, mv: PlayedMove) {
        self.moves.push(mv);
    }

    fn played(&self) -> Vec<&str> {
        self.moves.iter().map(|m| m.uci.as_str()).collect()
    }

    fn finish(self, verdict: Verdict) -> GameRecord {
        self.build(verdict.outcome, verdict.termination, None)
    }

    fn abort(self, reason: AbortReason) -> GameRecord {
        self.build(GameOutcome::Aborted, Termination::Abort, Some(reason))
    }

    fn build(
        self,
        outcome: GameOutcome,
        termination: Termination,
        abort: Option<AbortReason>,
    ) -> GameRecord {
        GameRecord {
            id: self.id,
            ticket: self.ticket,
            white: self.white,
            black: self.black,
            opening: self.opening,
            moves: self.moves,
            outcome,
            termination,
            abort,
            started_at: self.started_at,
            elapsed_ms: self.clock.elapsed().as_millis() as u64,
        }
    }
}

/// Runs games with a fixed set of game settings. Cheap to share between
/// tasks behind an `Arc`.
pub struct GameRunner {
    launcher: Arc<dyn SessionLauncher>,
    settings: GameSettings,
}

impl GameRunner {
    pub fn new(launcher: Arc<dyn SessionLauncher>, settings: GameSettings) -> Self {
        Self { launcher, settings }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Play a full game. Never fails: anything that goes wrong ends the game
    /// as `Aborted` with a reason attached. Both engines are quit on every
    /// path.
    pub async fn play(
        &self,
        ticket: u64,
        white: &EngineConfig,
        black: &EngineConfig,
        opening: &Opening,
    ) -> GameRecord {
        let mut game = GameBuilder::start(ticket, &white.name, &black.name, opening);
        let span = tracing::info_span!(
            "game",
            id = %game.id,
            ticket,
            white = %white.name,
            black = %black.name
        );

        async move {
            let mut arbiter = match CozyArbiter::new(opening) {
                Ok(arbiter) => arbiter,
                Err(e) => {
                    let reason = AbortReason {
                        kind: AbortKind::InvalidOpening,
                        engine: white.name.clone(),
                        side: Side::White,
                        move_number: 1,
                        detail: e.to_string(),
                    };
                    tracing::warn!(reason = %reason, "game aborted");
                    return game.abort(reason);
                }
            };

            let mut sessions: Vec<Box<dyn EngineSession>> = Vec::with_capacity(2);
            let result = self
                .run(&mut sessions, [white, black], &mut arbiter, &mut game)
                .await;
            for session in &mut sessions {
                session.quit().await;
            }

            let record = match result {
                Ok(verdict) => game.finish(verdict),
                Err(reason) => {
                    tracing::warn!(reason = %reason, "game aborted");
                    game.abort(reason)
                }
            };
            tracing::info!(
                result = record.outcome.result_str(),
                termination = ?record.termination,
                plies = record.moves.len(),
                elapsed_ms = record.elapsed_ms,
                "game finished"
            );
            record
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        sessions: &mut Vec<Box<dyn EngineSession>>,
        engines: [&EngineConfig; 2],
        arbiter: &mut CozyArbiter,
        game: &mut GameBuilder,
    ) -> Result<Verdict, AbortReason> {
        let handshake_timeout = self.settings.handshake_timeout();
        for (engine, side) in engines.into_iter().zip([Side::White, Side::Black]) {
            let blame = |e: SessionError| abort_reason(&e, engine, side, 1);
            let mut session = self
                .launcher
                .launch(engine, &self.settings)
                .await
                .map_err(blame)?;
            let prepared = async {
                session.handshake(handshake_timeout).await?;
                session.new_game(handshake_timeout).await
            }
            .await;
            sessions.push(session);
            prepared.map_err(blame)?;
        }

        let mut limits = self.settings.limits();
        let max_plies = self.settings.max_plies();
        let mut plies = 0u32;
        loop {
            if let Some(verdict) = arbiter.verdict() {
                return Ok(verdict);
            }
            if max_plies.is_some_and(|max| plies >= max) {
                tracing::debug!(plies, "move limit reached, adjudicating draw");
                return Ok(Verdict {
                    outcome: GameOutcome::Draw,
                    termination: Termination::MoveLimit,
                });
            }

            let side = arbiter.side_to_move();
            let idx = match side {
                Side::White => 0,
                Side::Black => 1,
            };
            let engine = engines[idx];
            let move_number = arbiter.fullmove_number();
            let blame = |e: SessionError| abort_reason(&e, engine, side, move_number);

            let session = &mut sessions[idx];
            let position = PositionSpec::from_opening(&game.opening, &game.played());
            session.set_position(&position).await.map_err(blame)?;

            let move_timeout = self.settings.move_timeout(&limits, side);
            let started = Instant::now();
            let result = session
                .search(limits, move_timeout)
                .await
                .map_err(blame)?;
            let elapsed = started.elapsed();
            let elapsed_ms = elapsed.as_millis() as u64;

            if let Some(clock) = limits.clock.as_mut() {
                let remaining = clock.remaining(side);
                if !clock.charge(side, elapsed) {
                    return Err(AbortReason {
                        kind: AbortKind::TimeForfeit,
                        engine: engine.name.clone(),
                        side,
                        move_number,
                        detail: format!(
                            "used {}ms with {}ms on the clock",
                            elapsed_ms,
                            remaining.as_millis()
                        ),
                    });
                }
            }

            if let Err(e) = arbiter.play(&result.best_move) {
                return Err(AbortReason {
                    kind: AbortKind::IllegalMove,
                    engine: engine.name.clone(),
                    side,
                    move_number,
                    detail: e.to_string(),
                });
            }
            tracing::trace!(side = %side, mv = %result.best_move, elapsed_ms, "move played");
            game.push(PlayedMove {
                uci: result.best_move.clone(),
                elapsed_ms,
                info: result.last_info().cloned(),
            });
            plies += 1;
        }
    }
}

fn abort_reason(
    error: &SessionError,
    engine: &EngineConfig,
    side: Side,
    move_number: u32,
) -> AbortReason {
    AbortReason {
        kind: error.abort_kind(),
        engine: engine.name.clone(),
        side,
        move_number,
        detail: error.to_string(),
    }
}
