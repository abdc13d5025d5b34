//! Composite builder — six pillar scores in, one `CompositeSnapshot` out.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::weighted_mean;
use crate::domain::{
    CompositeSnapshot, Exclusions, IndicatorExclusion, Pillar, PillarReading, PillarStatus,
    Regime, RegimeThresholds,
};
use crate::error::MacError;

fn one() -> f64 {
    1.0
}

/// Relative pillar weights. Defaults to equal weighting; weights need not
/// sum to 1 since the composite renormalizes over the defined pillars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PillarWeights {
    #[serde(default = "one")]
    pub liquidity: f64,
    #[serde(default = "one")]
    pub valuation: f64,
    #[serde(default = "one")]
    pub positioning: f64,
    #[serde(default = "one")]
    pub volatility: f64,
    #[serde(default = "one")]
    pub policy: f64,
    #[serde(default = "one")]
    pub international_contagion: f64,
}

impl Default for PillarWeights {
    fn default() -> Self {
        Self::equal()
    }
}

impl PillarWeights {
    pub fn equal() -> Self {
        Self {
            liquidity: 1.0,
            valuation: 1.0,
            positioning: 1.0,
            volatility: 1.0,
            policy: 1.0,
            international_contagion: 1.0,
        }
    }

    pub fn get(&self, pillar: Pillar) -> f64 {
        match pillar {
            Pillar::Liquidity => self.liquidity,
            Pillar::Valuation => self.valuation,
            Pillar::Positioning => self.positioning,
            Pillar::Volatility => self.volatility,
            Pillar::Policy => self.policy,
            Pillar::InternationalContagion => self.international_contagion,
        }
    }

    pub fn validate(&self) -> Result<(), MacError> {
        for pillar in Pillar::ALL {
            let w = self.get(pillar);
            if !w.is_finite() || w < 0.0 {
                return Err(MacError::config(
                    format!("pillar weight '{pillar}'"),
                    format!("must be finite and non-negative, got {w}"),
                ));
            }
        }
        if Pillar::ALL.iter().all(|p| self.get(*p) == 0.0) {
            return Err(MacError::config(
                "pillar weights",
                "at least one pillar weight must be positive",
            ));
        }
        Ok(())
    }
}

/// A pillar's value as handed to the builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PillarInput {
    Fresh(f64),
    CarriedForward { score: f64, age: usize },
    Undefined,
}

impl PillarInput {
    pub fn score(&self) -> Option<f64> {
        match self {
            PillarInput::Fresh(s) | PillarInput::CarriedForward { score: s, .. } => Some(*s),
            PillarInput::Undefined => None,
        }
    }
}

/// Combines pillar scores into a composite score and regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeBuilder {
    weights: PillarWeights,
    thresholds: RegimeThresholds,
}

impl Default for CompositeBuilder {
    fn default() -> Self {
        Self {
            weights: PillarWeights::equal(),
            thresholds: RegimeThresholds::default(),
        }
    }
}

impl CompositeBuilder {
    pub fn new(weights: PillarWeights, thresholds: RegimeThresholds) -> Result<Self, MacError> {
        weights.validate()?;
        thresholds.validate()?;
        Ok(Self {
            weights,
            thresholds,
        })
    }

    pub fn weights(&self) -> &PillarWeights {
        &self.weights
    }

    pub fn thresholds(&self) -> &RegimeThresholds {
        &self.thresholds
    }

    pub fn classify(&self, score: f64) -> Regime {
        self.thresholds.classify(score)
    }

    /// Build the snapshot for `date`.
    ///
    /// `inputs` is indexed in `Pillar::ALL` order. Undefined pillars (and
    /// pillars with zero weight) are excluded and the remaining weights
    /// renormalized. Fails with `NoDataAvailable` when nothing is left.
    pub fn build(
        &self,
        date: NaiveDate,
        inputs: &[PillarInput; Pillar::COUNT],
        indicator_exclusions: Vec<IndicatorExclusion>,
    ) -> Result<CompositeSnapshot, MacError> {
        let pairs = Pillar::ALL.iter().filter_map(|p| {
            inputs[p.index()]
                .score()
                .map(|s| (self.weights.get(*p), s))
        });
        let (composite, total) = weighted_mean(pairs).ok_or(MacError::NoDataAvailable { date })?;

        let mut exclusions = Exclusions {
            indicators: indicator_exclusions,
            ..Exclusions::default()
        };
        let pillars = Pillar::ALL
            .iter()
            .map(|&pillar| {
                let input = inputs[pillar.index()];
                let status = match input {
                    PillarInput::Fresh(_) => PillarStatus::Fresh,
                    PillarInput::CarriedForward { age, .. } => {
                        exclusions.carried_forward.push(pillar);
                        PillarStatus::CarriedForward { age }
                    }
                    PillarInput::Undefined => {
                        exclusions.pillars.push(pillar);
                        PillarStatus::Undefined
                    }
                };
                let effective_weight = match input.score() {
                    Some(_) => self.weights.get(pillar) / total,
                    None => 0.0,
                };
                PillarReading {
                    pillar,
                    score: input.score(),
                    status,
                    effective_weight,
                }
            })
            .collect();

        let composite = composite.clamp(0.0, 1.0);
        Ok(CompositeSnapshot {
            date,
            pillars,
            composite,
            regime: self.classify(composite),
            exclusions,
        })
    }
}
