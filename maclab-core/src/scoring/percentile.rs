//! Percentile-rank transfer for positioning data (CFTC Commitment of Traders
//! and similar crowding measures).
//!
//! The observation is ranked against the trailing window of its own prior
//! history. Crowding in either direction is stress, so the score depends only
//! on the distance from the window median:
//!
//! ```text
//! percentile in [tail, 1 - tail]   -> score in [0.0, 0.5)
//! percentile beyond either tail    -> score in [0.5, 1.0]
//! ```
//!
//! A reading exactly on a tail boundary scores 0.5.

use serde::{Deserialize, Serialize};

use super::{clamp_unit, Transfer, TransferError};

/// Score at which the tails begin.
const TAIL_SCORE: f64 = 0.5;

fn default_tail() -> f64 {
    0.10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileTransfer {
    /// Maximum number of prior observations in the ranking window.
    pub lookback: usize,
    /// Minimum number of prior observations before a score is produced.
    pub min_history: usize,
    /// Tail probability on each side (0.10 = below 10th / above 90th).
    #[serde(default = "default_tail")]
    pub tail: f64,
}

impl PercentileTransfer {
    pub fn new(lookback: usize, min_history: usize) -> Self {
        Self {
            lookback,
            min_history,
            tail: default_tail(),
        }
    }
}

/// Mid-rank percentile of `value` within `window`, in `[0, 1]`.
///
/// Ties count half, so a value equal to every element ranks at 0.5.
/// Returns `None` for an empty window.
pub fn percentile_rank(value: f64, window: &[f64]) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    let (below, equal) = window.iter().fold((0usize, 0usize), |(b, e), &x| {
        if x < value {
            (b + 1, e)
        } else if x == value {
            (b, e + 1)
        } else {
            (b, e)
        }
    });
    Some((below as f64 + 0.5 * equal as f64) / window.len() as f64)
}

impl Transfer for PercentileTransfer {
    fn kind(&self) -> &'static str {
        "percentile_rank"
    }

    fn lookback(&self) -> usize {
        self.lookback
    }

    fn validate(&self) -> Result<(), String> {
        if self.lookback == 0 {
            return Err("lookback must be at least 1".into());
        }
        if self.min_history == 0 || self.min_history > self.lookback {
            return Err(format!(
                "min_history must lie in [1, lookback={}], got {}",
                self.lookback, self.min_history
            ));
        }
        if !(self.tail > 0.0 && self.tail < 0.5) {
            return Err(format!("tail must lie in (0, 0.5), got {}", self.tail));
        }
        Ok(())
    }

    fn score(&self, value: f64, history: &[f64]) -> Result<f64, TransferError> {
        if !value.is_finite() {
            return Err(TransferError::NonFinite);
        }
        let start = history.len().saturating_sub(self.lookback);
        let window: Vec<f64> = history[start..]
            .iter()
            .copied()
            .filter(|x| x.is_finite())
            .collect();
        if window.len() < self.min_history {
            return Err(TransferError::InsufficientHistory {
                available: window.len(),
                required: self.min_history,
            });
        }
        let rank = percentile_rank(value, &window).ok_or(TransferError::InsufficientHistory {
            available: 0,
            required: self.min_history,
        })?;

        let distance = (rank - 0.5).abs() * 2.0;
        let tail_edge = 1.0 - 2.0 * self.tail;
        let score = if distance < tail_edge {
            TAIL_SCORE * distance / tail_edge
        } else {
            TAIL_SCORE + (1.0 - TAIL_SCORE) * (distance - tail_edge) / (1.0 - tail_edge)
        };
        Ok(clamp_unit(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn rank_mid_rank_ties() {
        assert_eq!(percentile_rank(5.0, &[5.0, 5.0, 5.0, 5.0]), Some(0.5));
        assert_eq!(percentile_rank(10.0, &[1.0, 2.0, 3.0, 4.0]), Some(1.0));
        assert_eq!(percentile_rank(0.0, &[1.0, 2.0, 3.0, 4.0]), Some(0.0));
        assert_eq!(percentile_rank(1.0, &[]), None);
    }

    #[test]
    fn median_scores_zero() {
        let t = PercentileTransfer::new(100, 10);
        let history = ramp(101);
        let score = t.score(50.0, &history).unwrap();
        assert!(score < 0.01, "score={score}");
    }

    #[test]
    fn extremes_score_high_in_both_directions() {
        let t = PercentileTransfer::new(100, 10);
        let history = ramp(100);
        let high = t.score(1_000.0, &history).unwrap();
        let low = t.score(-1_000.0, &history).unwrap();
        assert_eq!(high, 1.0);
        assert_eq!(low, 1.0);
    }

    #[test]
    fn symmetric_around_median() {
        let t = PercentileTransfer::new(100, 10);
        let history = ramp(100);
        let above = t.score(79.5, &history).unwrap();
        let below = t.score(19.5, &history).unwrap();
        assert!((above - below).abs() < 1e-12);
    }

    #[test]
    fn tails_cross_half() {
        let t = PercentileTransfer::new(100, 10);
        let history = ramp(100);
        assert!(t.score(95.5, &history).unwrap() >= 0.5);
        assert!(t.score(4.5, &history).unwrap() >= 0.5);
        assert!(t.score(70.5, &history).unwrap() < 0.5);
    }

    #[test]
    fn window_is_trailing_only() {
        let t = PercentileTransfer::new(10, 5);
        let mut history = vec![1_000.0; 50];
        history.extend(ramp(10));
        // Old extreme values fall outside the 10-observation window.
        let score = t.score(4.5, &history).unwrap();
        assert!(score < 0.05, "score={score}");
    }

    #[test]
    fn insufficient_history() {
        let t = PercentileTransfer::new(52, 20);
        let err = t.score(1.0, &ramp(5)).unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientHistory {
                available: 5,
                required: 20
            }
        );
    }

    #[test]
    fn validation_rules() {
        assert!(PercentileTransfer::new(0, 0).validate().is_err());
        assert!(PercentileTransfer::new(10, 11).validate().is_err());
        let mut t = PercentileTransfer::new(10, 5);
        t.tail = 0.5;
        assert!(t.validate().is_err());
        t.tail = 0.05;
        assert!(t.validate().is_ok());
    }
}
