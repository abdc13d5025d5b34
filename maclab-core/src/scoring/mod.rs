//! Indicator transfer functions: raw observation in, bounded stress score out.
//!
//! Every transfer function is pure: `(value, trailing history, parameters)`
//! in, score in `[0, 1]` out. Higher scores mean less absorption capacity.
//!
//! # Look-ahead guard
//! `history` holds only observations strictly before the scored one. No
//! transfer function may be handed data from later dates.

pub mod convex;
pub mod linear;
pub mod percentile;

pub use convex::ConvexTransfer;
pub use linear::{Direction, LinearTransfer};
pub use percentile::{percentile_rank, PercentileTransfer};

use serde::{Deserialize, Serialize};

/// Lower score bound of the four qualitative bands shared by the band-based
/// transfer functions (Ample, Thin, Stretched, Critical).
pub const BAND_FLOORS: [f64; 4] = [0.0, 0.25, 0.50, 0.75];

/// Score width of one qualitative band.
pub const BAND_WIDTH: f64 = 0.25;

/// Why a transfer function could not score a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    InsufficientHistory { available: usize, required: usize },
    NonFinite,
}

/// Trait for transfer functions.
pub trait Transfer: Send + Sync {
    /// Short name of the transfer kind ("linear", "convex", "percentile_rank").
    fn kind(&self) -> &'static str;

    /// Maximum number of prior observations the function reads.
    fn lookback(&self) -> usize {
        0
    }

    /// Check parameters; the error string names the offending parameter.
    fn validate(&self) -> Result<(), String>;

    /// Score one value. The result is always within `[0, 1]`.
    fn score(&self, value: f64, history: &[f64]) -> Result<f64, TransferError>;
}

/// Serializable transfer-function configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferFunction {
    Linear(LinearTransfer),
    Convex(ConvexTransfer),
    PercentileRank(PercentileTransfer),
}

impl TransferFunction {
    pub fn as_transfer(&self) -> &dyn Transfer {
        match self {
            TransferFunction::Linear(t) => t,
            TransferFunction::Convex(t) => t,
            TransferFunction::PercentileRank(t) => t,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.as_transfer().kind()
    }

    pub fn lookback(&self) -> usize {
        self.as_transfer().lookback()
    }

    pub fn validate(&self) -> Result<(), String> {
        self.as_transfer().validate()
    }

    pub fn score(&self, value: f64, history: &[f64]) -> Result<f64, TransferError> {
        self.as_transfer().score(value, history)
    }
}

/// Clamp to the canonical `[0, 1]` score range. NaN is treated as maximal
/// stress.
pub(crate) fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        1.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Check that `bands` is finite and strictly increasing, with every gap
/// between neighbours representable as a finite `f64`.
pub(crate) fn check_strictly_increasing(bands: &[f64]) -> Result<(), String> {
    if bands.iter().any(|b| !b.is_finite()) {
        return Err(format!("band boundaries must be finite, got {bands:?}"));
    }
    if bands.windows(2).any(|w| w[0] >= w[1]) {
        return Err(format!(
            "band boundaries must be strictly increasing, got {bands:?}"
        ));
    }
    if bands.windows(2).any(|w| !(w[1] - w[0]).is_finite()) {
        return Err(format!("band widths overflow, got {bands:?}"));
    }
    Ok(())
}
