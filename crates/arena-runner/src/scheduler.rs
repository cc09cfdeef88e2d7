//! Tournament scheduling: pairings, the worker pool and aggregation.
//!
//! Every game runs in its own task; a semaphore caps how many are in flight.
//! Finished records travel over a channel to a single consumer, which is the
//! only place the standings and the record sink are touched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use arena_core::{
    AbortPolicy, EngineConfig, GameRecord, Opening, OpeningSource, RecordSink, Standings,
    TournamentSettings,
};

use crate::game_runner::GameRunner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    /// Every engine plays every other engine
    RoundRobin,
    /// One engine plays every other engine; the others do not meet
    Gauntlet { challenger: String },
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("a tournament needs at least two engines, got {0}")]
    TooFewEngines(usize),

    #[error("games per pair must be a positive even number, got {0}")]
    UnevenGames(u32),

    #[error("challenger `{0}` is not a configured engine")]
    UnknownChallenger(String),
}

/// One scheduled game. The engine fields index the tournament's engine list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTicket {
    pub id: u64,
    pub white: usize,
    pub black: usize,
    pub opening: Arc<Opening>,
    /// Pair-instance this game belongs to; both colour orders share it
    pub instance: u32,
}

/// Build the full ticket list.
///
/// For each engine pair there are `games_per_pair / 2` instances, each with
/// one opening drawn from `openings` and played twice with colours swapped.
/// Instances are interleaved across pairs so that a cancelled run leaves
/// every pair with a similar number of games.
pub fn schedule(
    engines: &[EngineConfig],
    pairing: &Pairing,
    games_per_pair: u32,
    openings: &mut dyn OpeningSource,
) -> Result<Vec<GameTicket>, ScheduleError> {
    if engines.len() < 2 {
        return Err(ScheduleError::TooFewEngines(engines.len()));
    }
    if games_per_pair == 0 || games_per_pair % 2 != 0 {
        return Err(ScheduleError::UnevenGames(games_per_pair));
    }

    let pairs: Vec<(usize, usize)> = match pairing {
        Pairing::RoundRobin => (0..engines.len())
            .flat_map(|a| (a + 1..engines.len()).map(move |b| (a, b)))
            .collect(),
        Pairing::Gauntlet { challenger } => {
            let c = engines
                .iter()
                .position(|e| &e.name == challenger)
                .ok_or_else(|| ScheduleError::UnknownChallenger(challenger.clone()))?;
            (0..engines.len())
                .filter(|&other| other != c)
                .map(|other| (c, other))
                .collect()
        }
    };

    let mut tickets = Vec::with_capacity(pairs.len() * games_per_pair as usize);
    for instance in 0..games_per_pair / 2 {
        for &(a, b) in &pairs {
            let opening = Arc::new(openings.next_opening());
            for (white, black) in [(a, b), (b, a)] {
                tickets.push(GameTicket {
                    id: tickets.len() as u64,
                    white,
                    black,
                    opening: Arc::clone(&opening),
                    instance,
                });
            }
        }
    }
    Ok(tickets)
}

/// Counters from one pass of the worker pool
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DispatchStats {
    pub dispatched: usize,
    /// Game tasks that panicked or were cancelled before reporting
    pub lost: usize,
}

/// Run tickets on the worker pool until they run out or `stop` fires, feeding
/// every finished record to `consume` on the calling task. In-flight games
/// always run to completion.
pub(crate) async fn dispatch<I>(
    runner: &Arc<GameRunner>,
    engines: &Arc<[EngineConfig]>,
    concurrency: usize,
    tickets: I,
    stop: &CancellationToken,
    mut consume: impl FnMut(GameRecord),
) -> DispatchStats
where
    I: IntoIterator<Item = GameTicket>,
{
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let (tx, mut rx) = mpsc::channel::<GameRecord>(concurrency);

    let producer = async {
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;
        for ticket in tickets {
            let permit = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if stop.is_cancelled() {
                break;
            }

            let runner = Arc::clone(runner);
            let engines = Arc::clone(engines);
            let tx = tx.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let record = runner
                    .play(
                        ticket.id,
                        &engines[ticket.white],
                        &engines[ticket.black],
                        &ticket.opening,
                    )
                    .await;
                if tx.send(record).await.is_err() {
                    tracing::warn!(ticket = ticket.id, "result channel closed, game dropped");
                }
            });
            dispatched += 1;
        }
        drop(tx);

        let mut lost = 0;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "game task failed");
                lost += 1;
            }
        }
        DispatchStats { dispatched, lost }
    };

    let consumer = async {
        while let Some(record) = rx.recv().await {
            consume(record);
        }
    };

    let (stats, ()) = tokio::join!(producer, consumer);
    stats
}

/// Outcome of a finished (or cancelled) tournament
#[derive(Debug, Clone)]
pub struct TournamentReport {
    pub standings: Standings,
    /// Every finished game, in schedule order
    pub records: Vec<GameRecord>,
    pub scheduled: usize,
    /// Games never started because the run was cancelled
    pub skipped: usize,
    /// Game tasks that died without reporting a record
    pub lost: usize,
    /// Records the sink failed to store
    pub sink_failures: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl TournamentReport {
    pub fn completed(&self) -> u32 {
        self.standings.completed()
    }

    pub fn aborted(&self) -> u32 {
        self.standings.aborted()
    }
}

/// Plays a ticket list across a bounded pool of game tasks.
pub struct Tournament {
    engines: Arc<[EngineConfig]>,
    runner: Arc<GameRunner>,
    concurrency: usize,
    abort_policy: AbortPolicy,
    cancel: CancellationToken,
}

impl Tournament {
    pub fn new(
        engines: Vec<EngineConfig>,
        runner: GameRunner,
        settings: &TournamentSettings,
    ) -> Self {
        Self {
            engines: engines.into(),
            runner: Arc::new(runner),
            concurrency: settings.effective_concurrency(),
            abort_policy: settings.abort_policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an external cancellation token (e.g. one wired to Ctrl-C).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn engines(&self) -> &[EngineConfig] {
        &self.engines
    }

    pub fn schedule(
        &self,
        pairing: &Pairing,
        games_per_pair: u32,
        openings: &mut dyn OpeningSource,
    ) -> Result<Vec<GameTicket>, ScheduleError> {
        schedule(&self.engines, pairing, games_per_pair, openings)
    }

    pub async fn run(
        &self,
        tickets: Vec<GameTicket>,
        sink: &mut dyn RecordSink,
    ) -> TournamentReport {
        let started = Instant::now();
        let scheduled = tickets.len();
        let mut standings = Standings::new(self.engines.iter().map(|e| e.name.clone()));
        let mut records = Vec::with_capacity(scheduled);
        let mut sink_failures = 0;

        tracing::info!(
            engines = self.engines.len(),
            games = scheduled,
            concurrency = self.concurrency,
            "tournament started"
        );

        let stats = dispatch(
            &self.runner,
            &self.engines,
            self.concurrency,
            tickets,
            &self.cancel,
            |record| {
                standings.record(&record, self.abort_policy);
                if let Err(e) = sink.write(&record) {
                    sink_failures += 1;
                    tracing::warn!(ticket = record.ticket, error = %e, "failed to store game record");
                }
                tracing::info!(
                    done = records.len() + 1,
                    total = scheduled,
                    white = %record.white,
                    black = %record.black,
                    result = record.outcome.result_str(),
                    "game recorded"
                );
                records.push(record);
            },
        )
        .await;

        if let Err(e) = sink.flush() {
            sink_failures += 1;
            tracing::warn!(error = %e, "failed to flush record sink");
        }
        records.sort_by_key(|r: &GameRecord| r.ticket);

        let cancelled = self.cancel.is_cancelled();
        let skipped = scheduled - stats.dispatched;
        if cancelled {
            tracing::warn!(skipped, "tournament cancelled");
        }
        if stats.lost > 0 {
            tracing::error!(lost = stats.lost, "some games never reported a result");
        }

        let report = TournamentReport {
            standings,
            records,
            scheduled,
            skipped,
            lost: stats.lost,
            sink_failures,
            cancelled,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            completed = report.completed(),
            aborted = report.aborted(),
            skipped = report.skipped,
            lost = report.lost,
            elapsed_s = report.elapsed.as_secs_f64(),
            "tournament finished"
        );
        report
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
