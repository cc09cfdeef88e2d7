//! Candidate-vs-baseline match that stops as soon as the SPRT decides.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use arena_core::{
    AbortPolicy, EngineConfig, GameRecord, OpeningSource, RecordSink, Sprt, SprtConfig,
    SprtDecision, TournamentSettings,
};

use crate::game_runner::GameRunner;
use crate::scheduler::{dispatch, GameTicket};

const CANDIDATE: usize = 0;
const BASELINE: usize = 1;

#[derive(Debug, Clone)]
pub struct SprtReport {
    pub candidate: String,
    pub baseline: String,
    pub sprt: Sprt,
    pub decision: SprtDecision,
    /// Every finished game, in schedule order
    pub records: Vec<GameRecord>,
    pub dispatched: usize,
    /// Games that ended in an abort, whatever the policy made of them
    pub aborted: u32,
    /// Game tasks that died without reporting a record
    pub lost: usize,
    pub sink_failures: usize,
    /// Stopped from outside before the test reached a decision
    pub interrupted: bool,
    pub elapsed: Duration,
}

/// Feeds game outcomes into an [`Sprt`] one at a time through the single
/// aggregating consumer, and stops dispatching once it decides.
pub struct SprtMatch {
    engines: Arc<[EngineConfig]>,
    runner: Arc<GameRunner>,
    concurrency: usize,
    abort_policy: AbortPolicy,
    cancel: CancellationToken,
}

impl SprtMatch {
    pub fn new(
        candidate: EngineConfig,
        baseline: EngineConfig,
        runner: GameRunner,
        settings: &TournamentSettings,
    ) -> Self {
        Self {
            engines: vec![candidate, baseline].into(),
            runner: Arc::new(runner),
            concurrency: settings.effective_concurrency(),
            abort_policy: settings.abort_policy,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn candidate(&self) -> &str {
        &self.engines[CANDIDATE].name
    }

    fn baseline(&self) -> &str {
        &self.engines[BASELINE].name
    }

    pub async fn run(
        &self,
        config: SprtConfig,
        openings: &mut dyn OpeningSource,
        sink: &mut dyn RecordSink,
    ) -> SprtReport {
        let started = Instant::now();
        let mut sprt = Sprt::new(config);
        let mut records = Vec::new();
        let mut sink_failures = 0;
        let mut aborted = 0;
        let decided = self.cancel.child_token();
        let (lower, upper) = config.bounds();

        tracing::info!(
            candidate = self.candidate(),
            baseline = self.baseline(),
            elo0 = config.elo0,
            elo1 = config.elo1,
            alpha = config.alpha,
            beta = config.beta,
            lower,
            upper,
            "sprt started"
        );

        // Mirrored pairs, generated lazily: even tickets draw a fresh opening
        // with the candidate as white, odd tickets replay it with colours
        // swapped.
        let mut next_id: u64 = 0;
        let mut current = None;
        let tickets = std::iter::from_fn(|| {
            if next_id >= u64::from(config.max_games) {
                return None;
            }
            let id = next_id;
            next_id += 1;
            if id % 2 == 0 || current.is_none() {
                current = Some(Arc::new(openings.next_opening()));
            }
            let opening = current.clone()?;
            let (white, black) = if id % 2 == 0 {
                (CANDIDATE, BASELINE)
            } else {
                (BASELINE, CANDIDATE)
            };
            Some(GameTicket {
                id,
                white,
                black,
                opening,
                instance: (id / 2) as u32,
            })
        });

        let candidate = self.candidate().to_string();
        let stats = dispatch(
            &self.runner,
            &self.engines,
            self.concurrency,
            tickets,
            &decided,
            |record| {
                if let Err(e) = sink.write(&record) {
                    sink_failures += 1;
                    tracing::warn!(ticket = record.ticket, error = %e, "failed to store game record");
                }
                if record.is_aborted() {
                    aborted += 1;
                }
                let was_terminal = sprt.decision().is_terminal();
                let outcome = record.outcome_for(&candidate, self.abort_policy);
                let decision = sprt.record(outcome);
                tracing::info!(
                    games = sprt.games(),
                    wins = sprt.wins(),
                    draws = sprt.draws(),
                    losses = sprt.losses(),
                    llr = sprt.llr(),
                    outcome = ?outcome,
                    "sprt update"
                );
                if decision.is_terminal() && !was_terminal {
                    tracing::info!(decision = %decision, games = sprt.games(), "sprt decided");
                    decided.cancel();
                }
                records.push(record);
            },
        )
        .await;

        if let Err(e) = sink.flush() {
            sink_failures += 1;
            tracing::warn!(error = %e, "failed to flush record sink");
        }
        records.sort_by_key(|r: &GameRecord| r.ticket);

        let interrupted = self.cancel.is_cancelled() && !sprt.decision().is_terminal();
        let decision = sprt.finish();
        if stats.lost > 0 {
            tracing::error!(lost = stats.lost, "some games never reported a result");
        }

        let elo = sprt.elo();
        tracing::info!(
            decision = %decision,
            games = sprt.games(),
            aborted,
            skipped = sprt.skipped(),
            late = sprt.late(),
            elo = %elo,
            interrupted,
            "sprt finished"
        );

        SprtReport {
            candidate,
            baseline: self.baseline().to_string(),
            sprt,
            decision,
            records,
            dispatched: stats.dispatched,
            aborted,
            lost: stats.lost,
            sink_failures,
            interrupted,
            elapsed: started.elapsed(),
        }
    }
}
