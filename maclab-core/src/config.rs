//! Model configuration: indicators, pillar weights, regime thresholds.
//!
//! Loaded from TOML and validated into a [`MacModel`] before any scoring.
//! Country or pillar calibration lives entirely in this data.
//!
//! ```toml
//! [[indicators]]
//! id = "vix"
//! pillar = "volatility"
//! weight = 1.0
//! [indicators.transfer]
//! kind = "convex"
//! bands = [12.0, 18.0, 28.0, 40.0]
//!
//! [pillars]
//! unnormalized_weights = false
//! [pillars.weights]
//! volatility = 2.0
//!
//! [regime]
//! thin = 0.25
//! stretched = 0.5
//! critical = 0.75
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::composite::{CompositeBuilder, PillarWeights};
use crate::domain::{IndicatorId, Pillar, RegimeThresholds};
use crate::error::MacError;
use crate::fingerprint::ConfigFingerprint;
use crate::model::{IndicatorSpec, MacModel};
use crate::scoring::TransferFunction;

/// Tolerance on the per-pillar weight sum when weights must be normalized.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

fn default_weight() -> f64 {
    1.0
}

/// One indicator entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub id: IndicatorId,
    pub pillar: Pillar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Accept the latest observation up to this many days old (0 = exact date).
    #[serde(default)]
    pub as_of_tolerance_days: u32,
    pub transfer: TransferFunction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PillarsConfig {
    /// Skip the check that member weights sum to 1 within each pillar.
    #[serde(default)]
    pub unnormalized_weights: bool,
    #[serde(default)]
    pub weights: PillarWeights,
}

/// Complete model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,
    #[serde(default)]
    pub pillars: PillarsConfig,
    #[serde(default)]
    pub regime: RegimeThresholds,
}

impl MacConfig {
    pub fn from_toml(content: &str) -> Result<Self, MacError> {
        toml::from_str(content).map_err(|e| MacError::config("toml", e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, MacError> {
        toml::to_string_pretty(self).map_err(|e| MacError::config("toml", e.to_string()))
    }

    pub fn fingerprint(&self) -> ConfigFingerprint {
        ConfigFingerprint::of(self)
    }

    /// Check every rule and build the executable model.
    ///
    /// Rejects: no indicators, empty or duplicate ids, negative or
    /// non-finite weights, invalid transfer parameters, pillars whose member
    /// weights have no positive mass, and (unless `unnormalized_weights`)
    /// pillars whose member weights do not sum to 1.
    pub fn validate(&self) -> Result<MacModel, MacError> {
        if self.indicators.is_empty() {
            return Err(MacError::config("indicators", "at least one indicator is required"));
        }

        let mut seen = BTreeSet::new();
        for ind in &self.indicators {
            let context = format!("indicator '{}'", ind.id);
            if ind.id.as_str().trim().is_empty() {
                return Err(MacError::config("indicators", "indicator id must not be empty"));
            }
            if !seen.insert(ind.id.clone()) {
                return Err(MacError::config(context, "duplicate indicator id"));
            }
            if !ind.weight.is_finite() || ind.weight < 0.0 {
                return Err(MacError::config(
                    context,
                    format!("weight must be finite and non-negative, got {}", ind.weight),
                ));
            }
            ind.transfer
                .validate()
                .map_err(|reason| MacError::config(context, reason))?;
        }

        for pillar in Pillar::ALL {
            let weights: Vec<f64> = self
                .indicators
                .iter()
                .filter(|i| i.pillar == pillar)
                .map(|i| i.weight)
                .collect();
            if weights.is_empty() {
                debug!(%pillar, "pillar has no indicators and will always be undefined");
                continue;
            }
            let sum: f64 = weights.iter().sum();
            if sum <= 0.0 {
                return Err(MacError::config(
                    format!("pillar '{pillar}'"),
                    "member weights must include a positive weight",
                ));
            }
            if !self.pillars.unnormalized_weights && (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(MacError::config(
                    format!("pillar '{pillar}'"),
                    format!(
                        "member weights sum to {sum}, expected 1 (set pillars.unnormalized_weights to allow)"
                    ),
                ));
            }
        }

        let builder = CompositeBuilder::new(self.pillars.weights, self.regime)?;
        let specs = self
            .indicators
            .iter()
            .map(|i| IndicatorSpec {
                id: i.id.clone(),
                pillar: i.pillar,
                unit: i.unit.clone(),
                weight: i.weight,
                as_of_tolerance_days: i.as_of_tolerance_days,
                transfer: i.transfer.clone(),
            })
            .collect();

        Ok(MacModel::new(specs, builder, self.fingerprint()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "us-baseline"

[[indicators]]
id = "vix"
pillar = "volatility"
unit = "index"
[indicators.transfer]
kind = "convex"

[[indicators]]
id = "ig_oas"
pillar = "valuation"
weight = 0.6
[indicators.transfer]
kind = "linear"
bands = [90.0, 250.0]

[[indicators]]
id = "hy_oas"
pillar = "valuation"
weight = 0.4
[indicators.transfer]
kind = "linear"
bands = [300.0, 800.0]

[[indicators]]
id = "cot_es"
pillar = "positioning"
[indicators.transfer]
kind = "percentile_rank"
lookback = 156
min_history = 52

[pillars.weights]
volatility = 2.0
"#;

    #[test]
    fn parses_and_validates_sample() {
        let cfg = MacConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(cfg.indicators.len(), 4);
        assert_eq!(cfg.pillars.weights.volatility, 2.0);
        assert_eq!(cfg.pillars.weights.liquidity, 1.0);
        assert_eq!(cfg.regime, RegimeThresholds::default());
        let model = cfg.validate().unwrap();
        assert_eq!(model.indicators().len(), 4);
        assert_eq!(model.members(Pillar::Valuation).count(), 2);
    }

    #[test]
    fn toml_round_trip_preserves_fingerprint() {
        let cfg = MacConfig::from_toml(SAMPLE).unwrap();
        let text = cfg.to_toml().unwrap();
        let back = MacConfig::from_toml(&text).unwrap();
        assert_eq!(cfg, back);
        assert_eq!(cfg.fingerprint(), back.fingerprint());
    }

    #[test]
    fn unnormalized_pillar_rejected_by_default() {
        let mut cfg = MacConfig::from_toml(SAMPLE).unwrap();
        cfg.indicators[1].weight = 0.9;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, MacError::Configuration { .. }), "{err}");
        cfg.pillars.unnormalized_weights = true;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn negative_weight_rejected() {
        let mut cfg = MacConfig::from_toml(SAMPLE).unwrap();
        cfg.pillars.unnormalized_weights = true;
        cfg.indicators[0].weight = -0.5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("vix"));
    }

    #[test]
    fn unordered_bands_rejected() {
        let mut cfg = MacConfig::from_toml(SAMPLE).unwrap();
        if let TransferFunction::Linear(t) = &mut cfg.indicators[1].transfer {
            t.bands = [250.0, 90.0];
        }
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("ig_oas"));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut cfg = MacConfig::from_toml(SAMPLE).unwrap();
        let dup = cfg.indicators[0].clone();
        cfg.indicators.push(dup);
        cfg.pillars.unnormalized_weights = true;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_config_rejected() {
        let cfg = MacConfig::from_toml("").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_configuration_error() {
        let err = MacConfig::from_toml("[[indicators]]\nid = 3").unwrap_err();
        assert!(matches!(err, MacError::Configuration { .. }));
    }
}
