//! Observation store — per-indicator series with enforced chronology.
//!
//! Each indicator's observations must arrive with strictly increasing dates.
//! A repeated or earlier date is `OutOfOrderData`; the store never reorders
//! or silently drops observations to repair chronology.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{IndicatorId, Observation};
use crate::error::MacError;

/// What to do when an indicator's stream is out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChronologyPolicy {
    /// Fail the whole ingestion with `OutOfOrderData`.
    #[default]
    Abort,
    /// Drop the offending indicator entirely and keep the rest.
    Quarantine,
}

/// An indicator removed from the store because its stream was out of order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedIndicator {
    pub indicator: IndicatorId,
    pub previous: NaiveDate,
    pub offending: NaiveDate,
}

/// One indicator's time series, sorted by date with no duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl IndicatorSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation. Returns the last recorded date when `date`
    /// does not strictly follow it.
    fn push(&mut self, date: NaiveDate, value: f64) -> Result<(), NaiveDate> {
        if let Some(&last) = self.dates.last() {
            if date <= last {
                return Err(last);
            }
        }
        self.dates.push(date);
        self.values.push(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<(NaiveDate, f64)> {
        Some((*self.dates.get(index)?, *self.values.get(index)?))
    }

    /// Index of the latest observation dated on or before `date`.
    pub fn position_at_or_before(&self, date: NaiveDate) -> Option<usize> {
        self.dates.partition_point(|d| *d <= date).checked_sub(1)
    }

    /// Index of the observation used at `date`: the latest one dated within
    /// `[date - tolerance_days, date]`. Zero tolerance means an exact match.
    pub fn lookup(&self, date: NaiveDate, tolerance_days: u32) -> Option<usize> {
        let idx = self.position_at_or_before(date)?;
        // A window reaching past the start of the calendar has no lower bound.
        match date.checked_sub_signed(Duration::days(i64::from(tolerance_days))) {
            Some(earliest) => (self.dates[idx] >= earliest).then_some(idx),
            None => Some(idx),
        }
    }

    /// Up to `lookback` values strictly before `index`.
    pub fn history_before(&self, index: usize, lookback: usize) -> &[f64] {
        let end = index.min(self.values.len());
        &self.values[end.saturating_sub(lookback)..end]
    }

    /// Copy of the series restricted to observations dated on or before `date`.
    pub fn truncated(&self, date: NaiveDate) -> Self {
        let end = self.dates.partition_point(|d| *d <= date);
        Self {
            dates: self.dates[..end].to_vec(),
            values: self.values[..end].to_vec(),
        }
    }
}

/// All ingested observations, keyed by indicator.
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    series: BTreeMap<IndicatorId, IndicatorSeries>,
    quarantined: Vec<QuarantinedIndicator>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest observations in feed order, aborting on the first chronology
    /// violation.
    pub fn from_observations<I>(observations: I) -> Result<Self, MacError>
    where
        I: IntoIterator<Item = Observation>,
    {
        Self::ingest(observations, ChronologyPolicy::Abort)
    }

    /// Ingest observations in feed order under the given chronology policy.
    ///
    /// Observations of different indicators may interleave freely; only the
    /// relative order within one indicator matters.
    pub fn ingest<I>(observations: I, policy: ChronologyPolicy) -> Result<Self, MacError>
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut store = Self::new();
        let mut rejected: BTreeSet<IndicatorId> = BTreeSet::new();

        for obs in observations {
            if rejected.contains(&obs.indicator) {
                continue;
            }
            let series = store.series.entry(obs.indicator.clone()).or_default();
            if let Err(previous) = series.push(obs.date, obs.value) {
                match policy {
                    ChronologyPolicy::Abort => {
                        return Err(MacError::OutOfOrderData {
                            indicator: obs.indicator,
                            previous,
                            offending: obs.date,
                        });
                    }
                    ChronologyPolicy::Quarantine => {
                        warn!(
                            indicator = %obs.indicator,
                            previous = %previous,
                            offending = %obs.date,
                            "quarantining out-of-order indicator"
                        );
                        store.series.remove(&obs.indicator);
                        store.quarantined.push(QuarantinedIndicator {
                            indicator: obs.indicator.clone(),
                            previous,
                            offending: obs.date,
                        });
                        rejected.insert(obs.indicator);
                    }
                }
            }
        }
        Ok(store)
    }

    pub fn series(&self, indicator: &IndicatorId) -> Option<&IndicatorSeries> {
        self.series.get(indicator)
    }

    pub fn indicator_ids(&self) -> impl Iterator<Item = &IndicatorId> {
        self.series.keys()
    }

    pub fn quarantined(&self) -> &[QuarantinedIndicator] {
        &self.quarantined
    }

    /// Total number of stored observations.
    pub fn len(&self) -> usize {
        self.series.values().map(IndicatorSeries::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted union of every observation date across all indicators.
    pub fn observation_dates(&self) -> Vec<NaiveDate> {
        let dates: BTreeSet<NaiveDate> = self
            .series
            .values()
            .flat_map(|s| s.dates().iter().copied())
            .collect();
        dates.into_iter().collect()
    }

    /// Earliest and latest observation dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.series.values().filter_map(|s| s.dates.first()).min()?;
        let last = self.series.values().filter_map(|s| s.dates.last()).max()?;
        Some((*first, *last))
    }

    /// Copy of the store holding only observations dated on or before `date`.
    pub fn truncated_at(&self, date: NaiveDate) -> Self {
        Self {
            series: self
                .series
                .iter()
                .map(|(id, s)| (id.clone(), s.truncated(date)))
                .collect(),
            quarantined: self.quarantined.clone(),
        }
    }

    /// BLAKE3 content hash over every stored observation.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (id, series) in &self.series {
            hasher.update(id.as_str().as_bytes());
            for (date, value) in series.dates.iter().zip(&series.values) {
                hasher.update(date.to_string().as_bytes());
                hasher.update(&value.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
