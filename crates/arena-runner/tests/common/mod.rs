//! In-memory engines with scripted behaviour for runner tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arena_core::arbiter::format_uci_move;
use arena_core::{CozyArbiter, EngineConfig, GameSettings, Opening, SearchInfo, SearchLimits};
use arena_runner::{
    EngineSession, PositionSpec, SearchResult, SessionError, SessionLauncher, SessionState,
};
use async_trait::async_trait;

pub const FOOLS_MATE: [&str; 4] = ["f2f3", "e7e5", "g2g4", "d8h4"];

/// Ruy Lopez main line (22 plies), White to move on move 12 afterwards
pub const RUY_LOPEZ: [&str; 22] = [
    "e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6", "e1g1", "f8e7", "f1e1", "b7b5",
    "a4b3", "d7d6", "c2c3", "e8g8", "h2h3", "c6a5", "b3c2", "c7c5", "d2d4", "d8c7",
];

#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Plays `line[n]` where `n` counts every move in the position; falls
    /// back to the first legal move past the end
    Line(Vec<String>),
    /// Plays its own n-th move from the list for the colour it has
    Sided { white: Vec<String>, black: Vec<String> },
    /// Process dies on the first `go`
    CrashOnSearch,
    /// Never answers `go`
    HangOnSearch,
    /// Panics inside `search`, taking the game task down with it
    PanicOnSearch,
    /// Thinks this long, then plays the first legal move
    Dawdle(Duration),
    FailHandshake,
    FailLaunch,
}

impl Behaviour {
    pub fn line(moves: &[&str]) -> Self {
        Behaviour::Line(moves.iter().map(|m| m.to_string()).collect())
    }

    /// Mates with Scholar's mate as white and Fool's mate as black, provided
    /// the opponent is a [`Behaviour::sheep`].
    pub fn wolf() -> Self {
        Behaviour::Sided {
            white: strings(&["e2e4", "f1c4", "d1h5", "h5f7"]),
            black: strings(&["e7e5", "d8h4"]),
        }
    }

    /// Walks into whichever mate the wolf is playing.
    pub fn sheep() -> Self {
        Behaviour::Sided {
            white: strings(&["f2f3", "g2g4"]),
            black: strings(&["e7e5", "b8c6", "g8f6"]),
        }
    }

    /// Knight shuffle; two shufflers draw by threefold repetition.
    pub fn shuffler() -> Self {
        Behaviour::Sided {
            white: strings(&["g1f3", "f3g1", "g1f3", "f3g1"]),
            black: strings(&["g8f6", "f6g8", "g8f6", "f6g8"]),
        }
    }
}

fn strings(moves: &[&str]) -> Vec<String> {
    moves.iter().map(|m| m.to_string()).collect()
}

pub fn engine(name: &str) -> EngineConfig {
    EngineConfig::new(name, format!("/scripted/{}", name))
}

pub fn fast_settings() -> GameSettings {
    GameSettings {
        move_time_ms: 10,
        timeout_margin_ms: 200,
        handshake_timeout_ms: 500,
        quit_timeout_ms: 100,
        stop_grace_ms: 50,
        max_plies: 200,
        ..GameSettings::default()
    }
}

/// Launches [`ScriptedSession`]s by engine name and counts lifecycle calls.
#[derive(Default)]
pub struct ScriptedLauncher {
    behaviours: HashMap<String, Behaviour>,
    pub launched: Arc<AtomicUsize>,
    pub quits: Arc<AtomicUsize>,
    /// Limits of every `go`, tagged with the searching engine
    pub searches: Arc<Mutex<Vec<(String, SearchLimits)>>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(name.to_string(), behaviour);
        self
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> Vec<(String, SearchLimits)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn launch(
        &self,
        engine: &EngineConfig,
        _settings: &GameSettings,
    ) -> Result<Box<dyn EngineSession>, SessionError> {
        let behaviour = self
            .behaviours
            .get(&engine.name)
            .cloned()
            .unwrap_or(Behaviour::Line(Vec::new()));
        if let Behaviour::FailLaunch = behaviour {
            return Err(SessionError::Launch {
                command: engine.command.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            name: engine.name.clone(),
            behaviour,
            state: SessionState::Starting,
            position: PositionSpec::default(),
            quits: Arc::clone(&self.quits),
            searches: Arc::clone(&self.searches),
            quit_done: false,
        }))
    }
}

pub struct ScriptedSession {
    name: String,
    behaviour: Behaviour,
    state: SessionState,
    position: PositionSpec,
    quits: Arc<AtomicUsize>,
    searches: Arc<Mutex<Vec<(String, SearchLimits)>>>,
    quit_done: bool,
}

impl ScriptedSession {
    fn first_legal_move(&self) -> String {
        let opening = Opening {
            fen: self.position.fen.clone(),
            moves: self.position.moves.clone(),
        };
        let Ok(arbiter) = CozyArbiter::new(&opening) else {
            return "0000".to_string();
        };
        let board = arbiter.board();
        let mut first = None;
        board.generate_moves(|moves| {
            first = moves.into_iter().next();
            true
        });
        first
            .map(|mv| format_uci_move(board, mv))
            .unwrap_or_else(|| "0000".to_string())
    }

    fn choose(&self) -> String {
        let ply = self.position.moves.len();
        let scripted = match &self.behaviour {
            Behaviour::Line(line) => line.get(ply).cloned(),
            Behaviour::Sided { white, black } => {
                let own = if ply % 2 == 0 { white } else { black };
                own.get(ply / 2).cloned()
            }
            _ => None,
        };
        scripted.unwrap_or_else(|| self.first_legal_move())
    }
}

#[async_trait]
impl EngineSession for ScriptedSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> SessionState {
        self.state
    }

    async fn handshake(&mut self, timeout: Duration) -> Result<(), SessionError> {
        if let Behaviour::FailHandshake = self.behaviour {
            tokio::time::sleep(timeout).await;
            self.state = SessionState::Terminated;
            return Err(SessionError::HandshakeTimeout {
                stage: "uciok".to_string(),
            });
        }
        self.state = SessionState::Ready;
        Ok(())
    }

    async fn new_game(&mut self, _timeout: Duration) -> Result<(), SessionError> {
        Ok(())
    }

    async fn set_position(&mut self, position: &PositionSpec) -> Result<(), SessionError> {
        if self.state != SessionState::Ready {
            return Err(SessionError::ProtocolViolation(format!(
                "position in state {:?}",
                self.state
            )));
        }
        self.position = position.clone();
        Ok(())
    }

    async fn search(
        &mut self,
        limits: SearchLimits,
        timeout: Duration,
    ) -> Result<SearchResult, SessionError> {
        self.searches
            .lock()
            .unwrap()
            .push((self.name.clone(), limits));
        match self.behaviour {
            Behaviour::CrashOnSearch => {
                self.state = SessionState::Terminated;
                Err(SessionError::EngineCrashed {
                    detail: "stdout closed; exit status: 139".to_string(),
                })
            }
            Behaviour::HangOnSearch => {
                tokio::time::sleep(timeout).await;
                self.state = SessionState::Terminated;
                Err(SessionError::SearchTimeout(timeout))
            }
            Behaviour::PanicOnSearch => panic!("{} panicked mid-search", self.name),
            _ => {
                match self.behaviour {
                    Behaviour::Dawdle(delay) => tokio::time::sleep(delay).await,
                    _ => tokio::task::yield_now().await,
                }
                let best_move = self.choose();
                Ok(SearchResult {
                    best_move: best_move.clone(),
                    ponder: None,
                    diagnostics: vec![SearchInfo {
                        depth: Some(1),
                        nodes: Some(1),
                        pv: vec![best_move],
                        ..SearchInfo::default()
                    }],
                })
            }
        }
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn quit(&mut self) {
        if !self.quit_done {
            self.quit_done = true;
            self.state = SessionState::Terminated;
            self.quits.fetch_add(1, Ordering::SeqCst);
        }
    }
}
