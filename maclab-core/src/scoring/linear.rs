//! Linear transfer: credit spreads, money-market spreads, term premium.
//!
//! The score moves linearly from 0 at the "normal" boundary to 1 at the
//! "stress" boundary and is clipped outside that interval.

use serde::{Deserialize, Serialize};

use super::{check_strictly_increasing, clamp_unit, Transfer, TransferError};

/// Which end of the band signals stress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Higher values mean more stress (spreads, premia).
    #[default]
    Rising,
    /// Lower values mean more stress (market depth, reserves).
    Falling,
}

/// `bands = [lower, upper]`, strictly increasing. With `Rising` the normal
/// boundary is `lower`; with `Falling` it is `upper`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTransfer {
    pub bands: [f64; 2],
    #[serde(default)]
    pub direction: Direction,
}

impl LinearTransfer {
    pub fn rising(normal: f64, stress: f64) -> Self {
        Self {
            bands: [normal, stress],
            direction: Direction::Rising,
        }
    }

    pub fn falling(stress: f64, normal: f64) -> Self {
        Self {
            bands: [stress, normal],
            direction: Direction::Falling,
        }
    }
}

impl Transfer for LinearTransfer {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn validate(&self) -> Result<(), String> {
        check_strictly_increasing(&self.bands)
    }

    fn score(&self, value: f64, _history: &[f64]) -> Result<f64, TransferError> {
        if !value.is_finite() {
            return Err(TransferError::NonFinite);
        }
        let [lower, upper] = self.bands;
        let width = upper - lower;
        let raw = match self.direction {
            Direction::Rising => (value - lower) / width,
            Direction::Falling => (upper - value) / width,
        };
        Ok(clamp_unit(raw))
    }
}
