//! Error type shared by every stage of the MAC pipeline.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{IndicatorId, Pillar};

/// Errors raised by scoring, aggregation, composition and ingestion.
///
/// `Configuration` is fatal for the affected configuration entry.
/// `InsufficientHistory`, `AllIndicatorsMissing` and `NoDataAvailable` are
/// recoverable by the caller. `OutOfOrderData` is fatal for the affected
/// indicator's stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MacError {
    #[error("configuration error in {context}: {reason}")]
    Configuration { context: String, reason: String },

    #[error(
        "insufficient history for '{indicator}': {available} prior observations, {required} required"
    )]
    InsufficientHistory {
        indicator: IndicatorId,
        available: usize,
        required: usize,
    },

    #[error("all indicators missing for pillar {pillar} on {date}")]
    AllIndicatorsMissing { pillar: Pillar, date: NaiveDate },

    #[error("no pillar data available on {date}")]
    NoDataAvailable { date: NaiveDate },

    #[error("non-finite observation for '{indicator}' on {date}")]
    NonFiniteObservation { indicator: IndicatorId, date: NaiveDate },

    #[error("out-of-order data for '{indicator}': {offending} does not follow {previous}")]
    OutOfOrderData {
        indicator: IndicatorId,
        previous: NaiveDate,
        offending: NaiveDate,
    },
}

impl MacError {
    pub fn config(context: impl Into<String>, reason: impl Into<String>) -> Self {
        MacError::Configuration {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can continue past this error at the next timestamp.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MacError::InsufficientHistory { .. }
                | MacError::NonFiniteObservation { .. }
                | MacError::AllIndicatorsMissing { .. }
                | MacError::NoDataAvailable { .. }
        )
    }
}
