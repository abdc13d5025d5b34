//! Observation — a single recorded value of one indicator on one date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::IndicatorId;

/// A single `(indicator, date, value)` triple.
///
/// Observations are supplied by the ingestion layer and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub indicator: IndicatorId,
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(indicator: impl Into<IndicatorId>, date: NaiveDate, value: f64) -> Self {
        Self {
            indicator: indicator.into(),
            date,
            value,
        }
    }
}
