//! CompositeSnapshot — the result of one evaluation at one date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{IndicatorId, Pillar, Regime};

/// How a pillar's value in a snapshot was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PillarStatus {
    /// Computed from observations available at the snapshot date.
    Fresh,
    /// Reused from an earlier evaluation `age` steps ago.
    CarriedForward { age: usize },
    /// No usable data; excluded from the composite.
    Undefined,
}

/// One pillar's contribution to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PillarReading {
    pub pillar: Pillar,
    pub score: Option<f64>,
    #[serde(flatten)]
    pub status: PillarStatus,
    /// Renormalized weight actually applied in the composite (0 if excluded).
    pub effective_weight: f64,
}

impl PillarReading {
    pub fn undefined(pillar: Pillar) -> Self {
        Self {
            pillar,
            score: None,
            status: PillarStatus::Undefined,
            effective_weight: 0.0,
        }
    }
}

/// Why an indicator did not contribute to its pillar at a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// No observation at (or within tolerance before) the snapshot date.
    Missing,
    /// Percentile window shorter than the configured minimum.
    InsufficientHistory { available: usize, required: usize },
    /// Observed value was NaN or infinite.
    NonFinite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorExclusion {
    pub indicator: IndicatorId,
    pub pillar: Pillar,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

/// Reliability metadata attached to every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exclusions {
    pub indicators: Vec<IndicatorExclusion>,
    /// Pillars left out of the composite.
    pub pillars: Vec<Pillar>,
    /// Pillars whose score was carried forward from an earlier step.
    pub carried_forward: Vec<Pillar>,
}

impl Exclusions {
    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty() && self.pillars.is_empty() && self.carried_forward.is_empty()
    }
}

/// Immutable result of evaluating the MAC index at one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSnapshot {
    pub date: NaiveDate,
    /// All six pillars, in `Pillar::ALL` order.
    pub pillars: Vec<PillarReading>,
    /// Composite score on the canonical [0,1] scale.
    pub composite: f64,
    pub regime: Regime,
    pub exclusions: Exclusions,
}

impl CompositeSnapshot {
    pub fn pillar_score(&self, pillar: Pillar) -> Option<f64> {
        self.reading(pillar).and_then(|r| r.score)
    }

    pub fn reading(&self, pillar: Pillar) -> Option<&PillarReading> {
        self.pillars.iter().find(|r| r.pillar == pillar)
    }

    /// Composite score on the [0,100] scale.
    pub fn composite_percent(&self) -> f64 {
        self.composite * 100.0
    }

    /// True when every pillar was fresh and no indicator was excluded.
    pub fn is_complete(&self) -> bool {
        self.exclusions.is_empty()
    }
}
