//! Elo estimates from win/draw/loss records

use serde::{Deserialize, Serialize};

use crate::serde_helpers::lenient_f64;

/// z-value of a two-sided 95% confidence interval
const Z_95: f64 = 1.959964;

/// Expected score of a player rated `elo_diff` points above the opponent
pub fn expected_score(elo_diff: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf(-elo_diff / 400.0))
}

/// Inverse of [`expected_score`]. A perfect score maps to +inf and a zero
/// score to -inf.
pub fn elo_from_score(score: f64) -> f64 {
    if score >= 1.0 {
        f64::INFINITY
    } else if score <= 0.0 {
        f64::NEG_INFINITY
    } else {
        400.0 * (score / (1.0 - score)).log10()
    }
}

/// Point estimate of the Elo difference: `400 * log10(s / (n - s))` with
/// `s = wins + draws / 2`. An empty record estimates 0.
pub fn estimate_elo(wins: u32, draws: u32, losses: u32) -> f64 {
    let n = f64::from(wins + draws + losses);
    if n == 0.0 {
        return 0.0;
    }
    let s = f64::from(wins) + 0.5 * f64::from(draws);
    if s == n {
        return f64::INFINITY;
    }
    if s == 0.0 {
        return f64::NEG_INFINITY;
    }
    400.0 * (s / (n - s)).log10()
}

/// Elo difference with a 95% error margin, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloEstimate {
    #[serde(with = "lenient_f64")]
    pub elo: f64,
    /// Half-width of the 95% interval, in Elo
    #[serde(with = "lenient_f64")]
    pub margin: f64,
    pub games: u32,
}

impl EloEstimate {
    pub fn from_record(wins: u32, draws: u32, losses: u32) -> Self {
        let games = wins + draws + losses;
        let elo = estimate_elo(wins, draws, losses);
        if games == 0 {
            return Self {
                elo,
                margin: f64::INFINITY,
                games,
            };
        }

        let n = f64::from(games);
        let (w, d, l) = (
            f64::from(wins) / n,
            f64::from(draws) / n,
            f64::from(losses) / n,
        );
        let mean = w + 0.5 * d;
        let variance =
            w * (1.0 - mean).powi(2) + d * (0.5 - mean).powi(2) + l * (0.0 - mean).powi(2);
        let stderr = (variance / n).sqrt();
        let low = elo_from_score(mean - Z_95 * stderr);
        let high = elo_from_score(mean + Z_95 * stderr);

        // an interval reaching a perfect or zero score is unbounded
        let margin = if low.is_finite() && high.is_finite() {
            (high - low) / 2.0
        } else {
            f64::INFINITY
        };
        Self { elo, margin, games }
    }
}

impl std::fmt::Display for EloEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.elo.is_finite() && self.margin.is_finite() {
            write!(f, "{:+.1} +/- {:.1}", self.elo, self.margin)
        } else if self.elo.is_finite() {
            write!(f, "{:+.1}", self.elo)
        } else if self.elo > 0.0 {
            write!(f, "+inf")
        } else {
            write!(f, "-inf")
        }
    }
}

#[cfg(test)]
#[path = "elo_tests.rs"]
mod elo_tests;
