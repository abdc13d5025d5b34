//! Regime — discrete absorption-capacity classification of a composite score.
//!
//! Bands are closed-lower / open-upper: a score exactly on a boundary belongs
//! to the higher-stress band.
//!
//! ```text
//! Ample      [0.0,       thin)
//! Thin       [thin,      stretched)
//! Stretched  [stretched, critical)
//! Critical   [critical,  1.0]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MacError;

/// Capacity regime, in increasing-stress order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Ample,
    Thin,
    Stretched,
    Critical,
}

impl Regime {
    pub const ALL: [Regime; 4] = [
        Regime::Ample,
        Regime::Thin,
        Regime::Stretched,
        Regime::Critical,
    ];

    /// Stretched or worse: the level that counts as an early-warning alert.
    pub fn is_warning(self) -> bool {
        self >= Regime::Stretched
    }

    pub fn description(self) -> &'static str {
        match self {
            Regime::Ample => "Ample absorption capacity",
            Regime::Thin => "Thin capacity, elevated sensitivity to shocks",
            Regime::Stretched => "Stretched capacity, disorderly repricing likely under stress",
            Regime::Critical => "Critical, little capacity left to absorb shocks",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Regime::Ample => "Ample",
            Regime::Thin => "Thin",
            Regime::Stretched => "Stretched",
            Regime::Critical => "Critical",
        };
        f.write_str(name)
    }
}

/// Lower boundaries of the Thin, Stretched and Critical bands on the [0,1]
/// composite scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeThresholds {
    pub thin: f64,
    pub stretched: f64,
    pub critical: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            thin: 0.25,
            stretched: 0.50,
            critical: 0.75,
        }
    }
}

impl RegimeThresholds {
    /// Boundaries must satisfy `0 < thin < stretched < critical <= 1`.
    pub fn validate(&self) -> Result<(), MacError> {
        let all_finite = [self.thin, self.stretched, self.critical]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(MacError::config("regime", "thresholds must be finite"));
        }
        if !(0.0 < self.thin
            && self.thin < self.stretched
            && self.stretched < self.critical
            && self.critical <= 1.0)
        {
            return Err(MacError::config(
                "regime",
                format!(
                    "thresholds must satisfy 0 < thin < stretched < critical <= 1, got {} / {} / {}",
                    self.thin, self.stretched, self.critical
                ),
            ));
        }
        Ok(())
    }

    /// Classify a composite score. Total over all inputs; NaN maps to Critical
    /// so that a broken score can never look benign.
    pub fn classify(&self, score: f64) -> Regime {
        if score.is_nan() || score >= self.critical {
            Regime::Critical
        } else if score >= self.stretched {
            Regime::Stretched
        } else if score >= self.thin {
            Regime::Thin
        } else {
            Regime::Ample
        }
    }
}
