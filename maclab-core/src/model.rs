//! Validated model — runs the scorer → aggregator → builder chain at one date.
//!
//! A `MacModel` holds only validated configuration. Every evaluation reads
//! the observation store and returns fresh values; nothing is cached between
//! calls.

use chrono::NaiveDate;

use crate::aggregate::{aggregate_pillar, MemberScore, PillarAggregate};
use crate::composite::{CompositeBuilder, PillarInput};
use crate::domain::{
    CompositeSnapshot, ExclusionReason, IndicatorExclusion, IndicatorId, Pillar,
};
use crate::error::MacError;
use crate::fingerprint::ConfigFingerprint;
use crate::scoring::{TransferError, TransferFunction};
use crate::store::ObservationStore;

/// A validated indicator definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSpec {
    pub id: IndicatorId,
    pub pillar: Pillar,
    pub unit: Option<String>,
    pub weight: f64,
    pub as_of_tolerance_days: u32,
    pub transfer: TransferFunction,
}

impl IndicatorSpec {
    /// Score one raw value given its trailing history.
    pub fn score_value(
        &self,
        date: NaiveDate,
        value: f64,
        history: &[f64],
    ) -> Result<f64, MacError> {
        self.transfer
            .score(value, history)
            .map_err(|e| match e {
                TransferError::InsufficientHistory {
                    available,
                    required,
                } => MacError::InsufficientHistory {
                    indicator: self.id.clone(),
                    available,
                    required,
                },
                TransferError::NonFinite => MacError::NonFiniteObservation {
                    indicator: self.id.clone(),
                    date,
                },
            })
    }

    /// Score this indicator at `date` from the store, using only observations
    /// dated on or before `date`.
    pub fn evaluate(&self, store: &ObservationStore, date: NaiveDate) -> Result<f64, ExclusionReason> {
        let series = store.series(&self.id).ok_or(ExclusionReason::Missing)?;
        let idx = series
            .lookup(date, self.as_of_tolerance_days)
            .ok_or(ExclusionReason::Missing)?;
        let value = series.values()[idx];
        let history = series.history_before(idx, self.transfer.lookback());
        self.transfer.score(value, history).map_err(|e| match e {
            TransferError::InsufficientHistory {
                available,
                required,
            } => ExclusionReason::InsufficientHistory {
                available,
                required,
            },
            TransferError::NonFinite => ExclusionReason::NonFinite,
        })
    }
}

/// Outcome of scoring and aggregating one pillar at one date.
#[derive(Debug, Clone, PartialEq)]
pub struct PillarEvaluation {
    pub pillar: Pillar,
    pub outcome: Result<PillarAggregate, MacError>,
    pub exclusions: Vec<IndicatorExclusion>,
}

impl PillarEvaluation {
    /// Builder input under the exclude policy.
    pub fn input(&self) -> PillarInput {
        match &self.outcome {
            Ok(agg) => PillarInput::Fresh(agg.score),
            Err(_) => PillarInput::Undefined,
        }
    }
}

/// Executable MAC model produced by `MacConfig::validate`.
#[derive(Debug, Clone)]
pub struct MacModel {
    indicators: Vec<IndicatorSpec>,
    members: [Vec<usize>; Pillar::COUNT],
    builder: CompositeBuilder,
    fingerprint: ConfigFingerprint,
}

impl MacModel {
    pub(crate) fn new(
        indicators: Vec<IndicatorSpec>,
        builder: CompositeBuilder,
        fingerprint: ConfigFingerprint,
    ) -> Self {
        let mut members: [Vec<usize>; Pillar::COUNT] = std::array::from_fn(|_| Vec::new());
        for (i, spec) in indicators.iter().enumerate() {
            members[spec.pillar.index()].push(i);
        }
        Self {
            indicators,
            members,
            builder,
            fingerprint,
        }
    }

    pub fn indicators(&self) -> &[IndicatorSpec] {
        &self.indicators
    }

    pub fn indicator(&self, id: &IndicatorId) -> Option<&IndicatorSpec> {
        self.indicators.iter().find(|s| &s.id == id)
    }

    pub fn members(&self, pillar: Pillar) -> impl Iterator<Item = &IndicatorSpec> {
        self.members[pillar.index()]
            .iter()
            .map(move |&i| &self.indicators[i])
    }

    pub fn builder(&self) -> &CompositeBuilder {
        &self.builder
    }

    pub fn fingerprint(&self) -> &ConfigFingerprint {
        &self.fingerprint
    }

    /// Score every member of `pillar` at `date` and aggregate.
    pub fn evaluate_pillar(
        &self,
        store: &ObservationStore,
        pillar: Pillar,
        date: NaiveDate,
    ) -> PillarEvaluation {
        let mut exclusions = Vec::new();
        let members: Vec<MemberScore> = self
            .members(pillar)
            .map(|spec| {
                let score = match spec.evaluate(store, date) {
                    Ok(score) => Some(score),
                    Err(reason) => {
                        exclusions.push(IndicatorExclusion {
                            indicator: spec.id.clone(),
                            pillar,
                            reason,
                        });
                        None
                    }
                };
                MemberScore::new(spec.id.clone(), spec.weight, score)
            })
            .collect();

        PillarEvaluation {
            pillar,
            outcome: aggregate_pillar(pillar, date, &members),
            exclusions,
        }
    }

    /// Evaluate all six pillars in `Pillar::ALL` order.
    pub fn evaluate_pillars(&self, store: &ObservationStore, date: NaiveDate) -> Vec<PillarEvaluation> {
        Pillar::ALL
            .iter()
            .map(|&p| self.evaluate_pillar(store, p, date))
            .collect()
    }

    /// Build a snapshot from pillar evaluations and explicit builder inputs.
    ///
    /// `inputs` normally comes from `PillarEvaluation::input`; a caller that
    /// carries scores forward substitutes its own values.
    pub fn assemble(
        &self,
        date: NaiveDate,
        evaluations: &[PillarEvaluation],
        inputs: &[PillarInput; Pillar::COUNT],
    ) -> Result<CompositeSnapshot, MacError> {
        let exclusions = evaluations
            .iter()
            .flat_map(|e| e.exclusions.iter().cloned())
            .collect();
        self.builder.build(date, inputs, exclusions)
    }

    /// Full single-date evaluation with undefined pillars excluded.
    pub fn evaluate(
        &self,
        store: &ObservationStore,
        date: NaiveDate,
    ) -> Result<CompositeSnapshot, MacError> {
        let evaluations = self.evaluate_pillars(store, date);
        let mut inputs = [PillarInput::Undefined; Pillar::COUNT];
        for eval in &evaluations {
            inputs[eval.pillar.index()] = eval.input();
        }
        self.assemble(date, &evaluations, &inputs)
    }
}
