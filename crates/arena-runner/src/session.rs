//! One engine process and the UCI conversation with it.
//!
//! A dedicated reader task forwards stdout lines into a bounded channel, so
//! every wait in here is a `recv` with a deadline rather than a blocking read
//! on the pipe. Another task keeps the tail of stderr for crash reports.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command as ProcessCommand};
use tokio::sync::mpsc;
use tokio::time::Instant;

use arena_core::{AbortKind, EngineConfig, GameSettings, SearchInfo, SearchLimits};

use crate::protocol::{Command, EngineLine, PositionSpec};

/// Stdout lines buffered between the reader task and the session
const LINE_BUFFER: usize = 1024;
/// Stderr lines kept for crash reports
const STDERR_TAIL: usize = 20;
/// How long to wait for an exit status after stdout closes
const EXIT_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Launched, handshake not done yet
    Starting,
    Ready,
    /// A `go` is outstanding
    Busy,
    Terminated,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out waiting for {stage}")]
    HandshakeTimeout { stage: String },

    #[error("handshake failed: {0}")]
    HandshakeProtocol(String),

    #[error("no bestmove within {}ms", .0.as_millis())]
    SearchTimeout(Duration),

    #[error("engine crashed: {detail}")]
    EngineCrashed { detail: String },

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl SessionError {
    /// How a game aborted by this error is tagged
    pub fn abort_kind(&self) -> AbortKind {
        match self {
            SessionError::Launch { .. } => AbortKind::EngineLaunchFailed,
            SessionError::HandshakeTimeout { .. } | SessionError::HandshakeProtocol(_) => {
                AbortKind::HandshakeFailed
            }
            SessionError::SearchTimeout(_) => AbortKind::SearchTimeout,
            SessionError::EngineCrashed { .. } => AbortKind::EngineCrashed,
            SessionError::ProtocolViolation(_) => AbortKind::ProtocolViolation,
        }
    }
}

/// What a finished search returned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: String,
    pub ponder: Option<String>,
    /// Every non-empty `info` line seen during the search, in order
    pub diagnostics: Vec<SearchInfo>,
}

impl SearchResult {
    /// The last diagnostics line, usually the deepest completed iteration
    pub fn last_info(&self) -> Option<&SearchInfo> {
        self.diagnostics.last()
    }
}

/// Conversation with one engine. Commands are strictly sequential: a search
/// must finish (or be stopped) before the next command is accepted.
#[async_trait]
pub trait EngineSession: Send {
    fn name(&self) -> &str;

    fn state(&self) -> SessionState;

    /// `uci` → `uciok`, configured options, `isready` → `readyok`.
    async fn handshake(&mut self, timeout: Duration) -> Result<(), SessionError>;

    /// `ucinewgame` followed by a readiness check.
    async fn new_game(&mut self, timeout: Duration) -> Result<(), SessionError>;

    async fn set_position(&mut self, position: &PositionSpec) -> Result<(), SessionError>;

    async fn search(
        &mut self,
        limits: SearchLimits,
        timeout: Duration,
    ) -> Result<SearchResult, SessionError>;

    /// Abort an in-flight search. A no-op when nothing is running.
    async fn stop(&mut self) -> Result<(), SessionError>;

    /// Shut the engine down, killing it if it does not exit in time.
    /// Calling it again does nothing.
    async fn quit(&mut self);
}

/// Turns an engine configuration into a live session.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(
        &self,
        engine: &EngineConfig,
        settings: &GameSettings,
    ) -> Result<Box<dyn EngineSession>, SessionError>;
}

/// Launches engines as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl SessionLauncher for ProcessLauncher {
    async fn launch(
        &self,
        engine: &EngineConfig,
        settings: &GameSettings,
    ) -> Result<Box<dyn EngineSession>, SessionError> {
        let session = UciSession::spawn(engine, settings)?;
        Ok(Box::new(session))
    }
}

/// [`EngineSession`] over a child process speaking UCI on stdin/stdout.
pub struct UciSession {
    name: String,
    options: Vec<(String, String)>,
    child: Child,
    stdin: ChildStdin,
    lines: mpsc::Receiver<String>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    state: SessionState,
    engine_id: Option<String>,
    stop_grace: Duration,
    quit_timeout: Duration,
    quit_done: bool,
}

impl UciSession {
    pub fn spawn(engine: &EngineConfig, settings: &GameSettings) -> Result<Self, SessionError> {
        let launch_error = |source: std::io::Error| SessionError::Launch {
            command: engine.command.display().to_string(),
            source,
        };

        let mut command = ProcessCommand::new(&engine.command);
        command
            .args(&engine.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &engine.working_dir {
            command.current_dir(dir);
        }
        let mut child = command.spawn().map_err(launch_error)?;

        let missing = |what: &str| {
            launch_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("{} not captured", what),
            ))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let (tx, lines) = mpsc::channel(LINE_BUFFER);
        let name = engine.name.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                tracing::trace!(engine = %name, line = %line, "<<");
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL)));
        let tail = Arc::clone(&stderr_tail);
        let name = engine.name.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                tracing::trace!(engine = %name, line = %line, "stderr");
                if let Ok(mut tail) = tail.lock() {
                    if tail.len() == STDERR_TAIL {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
        });

        tracing::debug!(engine = %engine.name, command = %engine.command.display(), "engine launched");
        Ok(Self {
            name: engine.name.clone(),
            options: engine
                .options
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            child,
            stdin,
            lines,
            stderr_tail,
            state: SessionState::Starting,
            engine_id: None,
            stop_grace: settings.stop_grace(),
            quit_timeout: settings.quit_timeout(),
            quit_done: false,
        })
    }

    /// Name the engine reported with `id name`
    pub fn engine_id(&self) -> Option<&str> {
        self.engine_id.as_deref()
    }

    async fn write_line(&mut self, command: &Command) -> std::io::Result<()> {
        let text = command.to_string();
        tracing::debug!(engine = %self.name, command = %text, ">>");
        self.stdin.write_all(text.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await
    }

    async fn send(&mut self, command: &Command) -> Result<(), SessionError> {
        match self.write_line(command).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.crashed(format!("write failed: {}", e)).await),
        }
    }

    /// Next stdout line, or `None` once `deadline` passes.
    async fn next_line(&mut self, deadline: Instant) -> Result<Option<EngineLine>, SessionError> {
        match tokio::time::timeout_at(deadline, self.lines.recv()).await {
            Err(_) => Ok(None),
            Ok(Some(line)) => Ok(Some(EngineLine::parse(&line))),
            Ok(None) => Err(self.crashed("stdout closed".to_string()).await),
        }
    }

    /// Mark the session dead and describe how it died.
    async fn crashed(&mut self, context: String) -> SessionError {
        self.state = SessionState::Terminated;
        let status = match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => status.to_string(),
            Ok(Err(e)) => format!("unknown exit status ({})", e),
            Err(_) => "still running".to_string(),
        };
        let tail = self
            .stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect::<Vec<_>>().join(" | "))
            .unwrap_or_default();
        let mut detail = format!("{}; {}", context, status);
        if !tail.is_empty() {
            detail.push_str("; stderr: ");
            detail.push_str(&tail);
        }
        tracing::warn!(engine = %self.name, detail = %detail, "engine crashed");
        SessionError::EngineCrashed { detail }
    }

    fn require(&self, state: SessionState, operation: &str) -> Result<(), SessionError> {
        if self.state == state {
            return Ok(());
        }
        let problem = match self.state {
            SessionState::Starting => "before the handshake",
            SessionState::Ready => "outside a search",
            SessionState::Busy => "while a search is in flight",
            SessionState::Terminated => "on a terminated session",
        };
        Err(SessionError::ProtocolViolation(format!(
            "{} {}",
            operation, problem
        )))
    }

    /// Wait for `expected` during the handshake.
    async fn handshake_wait(
        &mut self,
        expected: EngineLine,
        deadline: Instant,
    ) -> Result<(), SessionError> {
        let stage = match expected {
            EngineLine::UciOk => "uciok",
            _ => "readyok",
        };
        loop {
            let Some(line) = self.next_line(deadline).await? else {
                self.state = SessionState::Terminated;
                return Err(SessionError::HandshakeTimeout {
                    stage: stage.to_string(),
                });
            };
            if line == expected {
                return Ok(());
            }
            match line {
                EngineLine::Id { key, value } if key == "name" => self.engine_id = Some(value),
                EngineLine::BestMove { best, .. } => {
                    self.state = SessionState::Terminated;
                    return Err(SessionError::HandshakeProtocol(format!(
                        "unexpected `bestmove {}` before {}",
                        best, stage
                    )));
                }
                _ => {}
            }
        }
    }

    async fn run_handshake(&mut self, deadline: Instant) -> Result<(), SessionError> {
        self.send(&Command::Uci).await?;
        self.handshake_wait(EngineLine::UciOk, deadline).await?;

        for (name, value) in self.options.clone() {
            self.send(&Command::SetOption { name, value }).await?;
        }

        self.send(&Command::IsReady).await?;
        self.handshake_wait(EngineLine::ReadyOk, deadline).await
    }

    /// Read until `bestmove`, collecting diagnostics. `None` on deadline.
    async fn read_bestmove(
        &mut self,
        deadline: Instant,
    ) -> Result<Option<SearchResult>, SessionError> {
        let mut diagnostics = Vec::new();
        loop {
            match self.next_line(deadline).await? {
                None => return Ok(None),
                Some(EngineLine::BestMove { best, ponder }) => {
                    return Ok(Some(SearchResult {
                        best_move: best,
                        ponder,
                        diagnostics,
                    }))
                }
                Some(EngineLine::Info(info)) if !info.is_empty() => diagnostics.push(info),
                Some(_) => {}
            }
        }
    }
}

#[async_trait]
impl EngineSession for UciSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> SessionState {
        self.state
    }

    async fn handshake(&mut self, timeout: Duration) -> Result<(), SessionError> {
        self.require(SessionState::Starting, "handshake")?;
        let deadline = Instant::now() + timeout;

        // An engine that dies before `readyok` never got going, so this is a
        // handshake failure rather than a crash.
        match self.run_handshake(deadline).await {
            Ok(()) => {}
            Err(SessionError::EngineCrashed { detail }) => {
                return Err(SessionError::HandshakeProtocol(format!(
                    "engine exited during handshake: {}",
                    detail
                )));
            }
            Err(e) => return Err(e),
        }

        self.state = SessionState::Ready;
        tracing::debug!(
            engine = %self.name,
            id = self.engine_id.as_deref().unwrap_or("?"),
            "handshake complete"
        );
        Ok(())
    }

    async fn new_game(&mut self, timeout: Duration) -> Result<(), SessionError> {
        self.require(SessionState::Ready, "ucinewgame")?;
        let deadline = Instant::now() + timeout;
        self.send(&Command::UciNewGame).await?;
        self.send(&Command::IsReady).await?;
        loop {
            match self.next_line(deadline).await? {
                Some(EngineLine::ReadyOk) => return Ok(()),
                Some(_) => {}
                None => {
                    self.state = SessionState::Terminated;
                    return Err(SessionError::HandshakeTimeout {
                        stage: "readyok after ucinewgame".to_string(),
                    });
                }
            }
        }
    }

    async fn set_position(&mut self, position: &PositionSpec) -> Result<(), SessionError> {
        self.require(SessionState::Ready, "position")?;
        self.send(&Command::Position(position.clone())).await
    }

    async fn search(
        &mut self,
        limits: SearchLimits,
        timeout: Duration,
    ) -> Result<SearchResult, SessionError> {
        self.require(SessionState::Ready, "go")?;
        let deadline = Instant::now() + timeout;
        self.state = SessionState::Busy;
        self.send(&Command::Go(limits)).await?;

        if let Some(result) = self.read_bestmove(deadline).await? {
            self.state = SessionState::Ready;
            return Ok(result);
        }

        tracing::warn!(engine = %self.name, timeout_ms = timeout.as_millis() as u64, "search timed out");
        // Best effort: give the engine a chance to answer `stop` so the log
        // shows whether it was merely slow or hung.
        if self.send(&Command::Stop).await.is_ok() {
            let grace = Instant::now() + self.stop_grace;
            if let Ok(Some(late)) = self.read_bestmove(grace).await {
                tracing::debug!(engine = %self.name, best = %late.best_move, "late bestmove after stop");
            }
        }
        self.state = SessionState::Terminated;
        Err(SessionError::SearchTimeout(timeout))
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Busy {
            return Ok(());
        }
        self.send(&Command::Stop).await?;
        let deadline = Instant::now() + self.stop_grace;
        match self.read_bestmove(deadline).await? {
            Some(_) => {
                self.state = SessionState::Ready;
                Ok(())
            }
            None => {
                self.state = SessionState::Terminated;
                Err(SessionError::SearchTimeout(self.stop_grace))
            }
        }
    }

    async fn quit(&mut self) {
        if self.quit_done {
            return;
        }
        self.quit_done = true;
        self.state = SessionState::Terminated;

        if let Err(e) = self.write_line(&Command::Quit).await {
            tracing::debug!(engine = %self.name, error = %e, "quit not delivered");
        }
        match tokio::time::timeout(self.quit_timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(engine = %self.name, status = %status, "engine exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(engine = %self.name, error = %e, "failed to reap engine");
            }
            Err(_) => {
                tracing::warn!(engine = %self.name, "engine ignored quit, killing");
                if let Err(e) = self.child.kill().await {
                    tracing::warn!(engine = %self.name, error = %e, "failed to kill engine");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
