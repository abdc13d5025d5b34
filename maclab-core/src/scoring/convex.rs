//! Convex transfer for volatility indicators (VIX and peers).
//!
//! Four contiguous input bands map onto the four score bands:
//!
//! ```text
//! input                     band        score range
//! [b0, b1)                  Ample       [0.00, 0.25)
//! [b1, b2)  and  (-inf, b0) Thin        [0.25, 0.50)
//! [b2, b3)                  Stretched   [0.50, 0.75)
//! [b3, +inf)                Critical    [0.75, 1.00]
//! ```
//!
//! Inside each band the score follows `floor + 0.25 * x^exponent`, where `x`
//! is the position within the band, so the curve steepens towards the top of
//! every band. Above `b3` the position is measured against `saturation`, where
//! the score reaches 1. Below `b0` (complacency) the score rises as the input
//! falls, up to `complacency_peak`, which stays inside the Thin band.

use serde::{Deserialize, Serialize};

use super::{check_strictly_increasing, clamp_unit, Transfer, TransferError, BAND_FLOORS, BAND_WIDTH};

fn default_bands() -> [f64; 4] {
    [12.0, 18.0, 28.0, 40.0]
}

fn default_exponent() -> f64 {
    2.0
}

fn default_saturation() -> f64 {
    80.0
}

fn default_complacency_peak() -> f64 {
    0.45
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexTransfer {
    /// Lower boundaries of Ample, Thin, Stretched and Critical.
    #[serde(default = "default_bands")]
    pub bands: [f64; 4],
    /// Curvature inside each band; 1.0 is piecewise linear.
    #[serde(default = "default_exponent")]
    pub exponent: f64,
    /// Input at which the Critical band reaches a score of 1.
    #[serde(default = "default_saturation")]
    pub saturation: f64,
    /// Highest score reachable in the complacency sub-range.
    #[serde(default = "default_complacency_peak")]
    pub complacency_peak: f64,
}

impl Default for ConvexTransfer {
    fn default() -> Self {
        Self {
            bands: default_bands(),
            exponent: default_exponent(),
            saturation: default_saturation(),
            complacency_peak: default_complacency_peak(),
        }
    }
}

impl ConvexTransfer {
    fn curve(&self, position: f64) -> f64 {
        position.clamp(0.0, 1.0).powf(self.exponent)
    }
}

impl Transfer for ConvexTransfer {
    fn kind(&self) -> &'static str {
        "convex"
    }

    fn validate(&self) -> Result<(), String> {
        check_strictly_increasing(&self.bands)?;
        if !self.exponent.is_finite() || self.exponent < 1.0 {
            return Err(format!("exponent must be >= 1, got {}", self.exponent));
        }
        if !(self.saturation - self.bands[3]).is_finite() || self.saturation <= self.bands[3] {
            return Err(format!(
                "saturation must exceed the critical boundary {}, got {}",
                self.bands[3], self.saturation
            ));
        }
        let thin = BAND_FLOORS[1];
        let stretched = BAND_FLOORS[2];
        if !(self.complacency_peak >= thin && self.complacency_peak < stretched) {
            return Err(format!(
                "complacency_peak must lie in [{thin}, {stretched}), got {}",
                self.complacency_peak
            ));
        }
        Ok(())
    }

    fn score(&self, value: f64, _history: &[f64]) -> Result<f64, TransferError> {
        if !value.is_finite() {
            return Err(TransferError::NonFinite);
        }
        let [b0, b1, b2, b3] = self.bands;

        let score = if value < b0 {
            let depth = (b0 - value) / (b1 - b0);
            BAND_FLOORS[1] + (self.complacency_peak - BAND_FLOORS[1]) * self.curve(depth)
        } else if value < b1 {
            BAND_FLOORS[0] + BAND_WIDTH * self.curve((value - b0) / (b1 - b0))
        } else if value < b2 {
            BAND_FLOORS[1] + BAND_WIDTH * self.curve((value - b1) / (b2 - b1))
        } else if value < b3 {
            BAND_FLOORS[2] + BAND_WIDTH * self.curve((value - b2) / (b3 - b2))
        } else {
            BAND_FLOORS[3] + BAND_WIDTH * self.curve((value - b3) / (self.saturation - b3))
        };
        Ok(clamp_unit(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vix() -> ConvexTransfer {
        ConvexTransfer::default()
    }

    fn s(v: f64) -> f64 {
        vix().score(v, &[]).unwrap()
    }

    #[test]
    fn high_side_strictly_increasing() {
        assert!(s(35.0) > s(29.0));
        assert!(s(29.0) > s(20.0));
        assert!(s(20.0) > s(15.0));
    }

    #[test]
    fn complacency_and_elevated_exceed_ample() {
        assert!(s(8.0) > s(15.0));
        assert!(s(25.0) > s(15.0));
    }

    #[test]
    fn band_floors_at_boundaries() {
        assert_eq!(s(12.0), 0.0);
        assert_eq!(s(18.0), 0.25);
        assert_eq!(s(28.0), 0.50);
        assert_eq!(s(40.0), 0.75);
        assert_eq!(s(80.0), 1.0);
        assert_eq!(s(150.0), 1.0);
    }

    #[test]
    fn complacency_stays_in_thin_band() {
        for v in [11.9, 8.0, 5.0, 0.0, -10.0] {
            let score = s(v);
            assert!((0.25..0.5).contains(&score), "v={v} score={score}");
        }
        assert!(s(5.0) > s(10.0));
    }

    #[test]
    fn continuous_across_high_side_boundaries() {
        let eps = 1e-9;
        for b in [18.0, 28.0, 40.0] {
            assert!((s(b) - s(b - eps)).abs() < 1e-6, "jump at {b}");
        }
    }

    #[test]
    fn convex_within_band() {
        // Second half of the Stretched band gains more than the first half.
        let first = s(34.0) - s(28.0);
        let second = s(40.0 - 1e-9) - s(34.0);
        assert!(second > first);
    }

    #[test]
    fn validation_rules() {
        let mut t = vix();
        assert!(t.validate().is_ok());
        t.exponent = 0.5;
        assert!(t.validate().is_err());
        let mut t = vix();
        t.saturation = 40.0;
        assert!(t.validate().is_err());
        let mut t = vix();
        t.complacency_peak = 0.5;
        assert!(t.validate().is_err());
        let mut t = vix();
        t.bands = [12.0, 28.0, 18.0, 40.0];
        assert!(t.validate().is_err());
        let mut t = vix();
        t.bands = [-f64::MAX, -1.5e308, -1.2e308, -1e308];
        t.saturation = 1e308;
        assert!(t.validate().is_err());
    }
}
