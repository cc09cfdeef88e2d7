//! Sequential probability ratio test over win/draw/loss outcomes.
//!
//! Outcomes are modelled as draws from a trinomial distribution whose
//! probabilities follow from an assumed Elo difference through the logistic
//! curve. Each hypothesis (`elo0` = no improvement, `elo1` = candidate is
//! stronger) induces one `(win, draw, loss)` triple; the log-likelihood ratio
//! of the observed counts under the two triples is compared against Wald's
//! boundaries after every game.
//!
//! Note that with the plain logistic mapping `p_win + p_loss = 1`, so the
//! draw probability is zero under both hypotheses and draws do not move the
//! LLR. They still count as games for the cap and the Elo estimate.

use serde::{Deserialize, Serialize};

use crate::elo::{expected_score, EloEstimate};
use crate::game::MatchOutcome;

/// Probabilities are floored here before taking logarithms
pub const PROBABILITY_FLOOR: f64 = 1e-10;

/// Parameters of one SPRT run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprtConfig {
    /// Null hypothesis: Elo difference of the candidate
    pub elo0: f64,
    /// Alternative hypothesis
    pub elo1: f64,
    /// False-positive rate (accepting H1 when H0 holds)
    pub alpha: f64,
    /// False-negative rate (accepting H0 when H1 holds)
    pub beta: f64,
    /// Games after which the test ends inconclusively
    pub max_games: u32,
}

impl Default for SprtConfig {
    fn default() -> Self {
        Self {
            elo0: 0.0,
            elo1: 50.0,
            alpha: 0.1,
            beta: 0.1,
            max_games: 10_000,
        }
    }
}

impl SprtConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(format!("sprt alpha must be in (0, 1), got {}", self.alpha));
        }
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(format!("sprt beta must be in (0, 1), got {}", self.beta));
        }
        if self.alpha + self.beta >= 1.0 {
            return Err("sprt alpha + beta must be below 1".to_string());
        }
        if !(self.elo1 > self.elo0) {
            return Err(format!(
                "sprt elo1 ({}) must be greater than elo0 ({})",
                self.elo1, self.elo0
            ));
        }
        if self.max_games == 0 {
            return Err("sprt max_games must be positive".to_string());
        }
        Ok(())
    }

    /// Wald's decision boundaries `(lower, upper)`
    pub fn bounds(&self) -> (f64, f64) {
        (
            (self.beta / (1.0 - self.alpha)).ln(),
            ((1.0 - self.beta) / self.alpha).ln(),
        )
    }
}

/// Outcome probabilities implied by an Elo difference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wdl {
    pub win: f64,
    pub draw: f64,
    pub loss: f64,
}

pub fn wdl_probabilities(elo: f64) -> Wdl {
    let win = expected_score(elo);
    let loss = expected_score(-elo);
    Wdl {
        win,
        draw: 1.0 - win - loss,
        loss,
    }
}

/// Log-likelihood ratio of `(wins, draws, losses)` under `elo1` versus `elo0`.
pub fn log_likelihood_ratio(wins: u32, draws: u32, losses: u32, elo0: f64, elo1: f64) -> f64 {
    let p0 = wdl_probabilities(elo0);
    let p1 = wdl_probabilities(elo1);
    let log = |p: f64| p.max(PROBABILITY_FLOOR).ln();
    f64::from(wins) * (log(p1.win) - log(p0.win))
        + f64::from(draws) * (log(p1.draw) - log(p0.draw))
        + f64::from(losses) * (log(p1.loss) - log(p0.loss))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprtDecision {
    Continue,
    /// No improvement
    AcceptH0,
    /// Candidate is stronger
    AcceptH1,
    /// The game cap was reached without crossing a boundary
    Inconclusive,
}

impl SprtDecision {
    pub fn is_terminal(self) -> bool {
        self != SprtDecision::Continue
    }
}

impl std::fmt::Display for SprtDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SprtDecision::Continue => "continue",
            SprtDecision::AcceptH0 => "H0 accepted: no Elo gain",
            SprtDecision::AcceptH1 => "H1 accepted: candidate is stronger",
            SprtDecision::Inconclusive => "inconclusive: game cap reached",
        };
        f.write_str(text)
    }
}

/// Running SPRT state. Fed one outcome at a time by a single consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprt {
    config: SprtConfig,
    wins: u32,
    draws: u32,
    losses: u32,
    skipped: u32,
    /// Outcomes that arrived after the decision was made
    late: u32,
    decision: SprtDecision,
}

impl Sprt {
    pub fn new(config: SprtConfig) -> Self {
        Self {
            config,
            wins: 0,
            draws: 0,
            losses: 0,
            skipped: 0,
            late: 0,
            decision: SprtDecision::Continue,
        }
    }

    /// Add one outcome and return the decision. Once terminal, the state is
    /// frozen and further outcomes are only counted as late.
    pub fn record(&mut self, outcome: MatchOutcome) -> SprtDecision {
        if self.decision.is_terminal() {
            if outcome != MatchOutcome::Skipped {
                self.late += 1;
            }
            return self.decision;
        }
        match outcome {
            MatchOutcome::Win => self.wins += 1,
            MatchOutcome::Draw => self.draws += 1,
            MatchOutcome::Loss => self.losses += 1,
            MatchOutcome::Skipped => {
                self.skipped += 1;
                return self.decision;
            }
        }

        let llr = self.llr();
        let (lower, upper) = self.config.bounds();
        self.decision = if llr >= upper {
            SprtDecision::AcceptH1
        } else if llr <= lower {
            SprtDecision::AcceptH0
        } else if self.games() >= self.config.max_games {
            SprtDecision::Inconclusive
        } else {
            SprtDecision::Continue
        };
        self.decision
    }

    /// Close the test when no more games will arrive.
    pub fn finish(&mut self) -> SprtDecision {
        if self.decision == SprtDecision::Continue {
            self.decision = SprtDecision::Inconclusive;
        }
        self.decision
    }

    pub fn llr(&self) -> f64 {
        log_likelihood_ratio(
            self.wins,
            self.draws,
            self.losses,
            self.config.elo0,
            self.config.elo1,
        )
    }

    pub fn bounds(&self) -> (f64, f64) {
        self.config.bounds()
    }

    pub fn elo(&self) -> EloEstimate {
        EloEstimate::from_record(self.wins, self.draws, self.losses)
    }

    pub fn config(&self) -> &SprtConfig {
        &self.config
    }

    pub fn decision(&self) -> SprtDecision {
        self.decision
    }

    /// Counted games (wins + draws + losses)
    pub fn games(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn draws(&self) -> u32 {
        self.draws
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn late(&self) -> u32 {
        self.late
    }
}

#[cfg(test)]
#[path = "sprt_tests.rs"]
mod sprt_tests;
