//! Pillar aggregation — weighted average of member indicator scores.
//!
//! Missing members are dropped and the remaining weights renormalized; a
//! missing indicator never counts as zero stress. Members are combined in
//! indicator-id order, so the result does not depend on input order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{IndicatorId, Pillar};
use crate::error::MacError;

/// One member indicator's input to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberScore {
    pub indicator: IndicatorId,
    pub weight: f64,
    /// `None` when the indicator has no usable observation at the date.
    pub score: Option<f64>,
}

impl MemberScore {
    pub fn new(indicator: impl Into<IndicatorId>, weight: f64, score: Option<f64>) -> Self {
        Self {
            indicator: indicator.into(),
            weight,
            score,
        }
    }
}

/// Aggregated pillar score at one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarAggregate {
    pub pillar: Pillar,
    pub score: f64,
    /// Contributing members with their renormalized weights.
    pub weights: Vec<(IndicatorId, f64)>,
    /// Members left out for lack of data.
    pub missing: Vec<IndicatorId>,
}

/// Weighted mean over `(weight, value)` pairs. `None` when the total weight
/// is not positive.
pub(crate) fn weighted_mean<I>(pairs: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (weighted, total) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(acc, tw), (w, v)| (acc + w * v, tw + w));
    (total > 0.0).then(|| (weighted / total, total))
}

/// Rescale weights to sum to 1. All-zero input is returned unchanged.
pub fn renormalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return weights.to_vec();
    }
    weights.iter().map(|w| w / total).collect()
}

/// Combine member scores into one pillar score.
///
/// Fails with `AllIndicatorsMissing` when no member with positive weight
/// has a score. The caller decides whether to carry a previous value forward
/// or treat the pillar as undefined.
pub fn aggregate_pillar(
    pillar: Pillar,
    date: NaiveDate,
    members: &[MemberScore],
) -> Result<PillarAggregate, MacError> {
    let mut ordered: Vec<&MemberScore> = members.iter().collect();
    ordered.sort_by(|a, b| a.indicator.cmp(&b.indicator));

    let (present, missing): (Vec<&MemberScore>, Vec<&MemberScore>) =
        ordered.into_iter().partition(|m| m.score.is_some());

    let pairs = present
        .iter()
        .filter_map(|m| m.score.map(|s| (m.weight, s)));
    let (score, total) =
        weighted_mean(pairs).ok_or(MacError::AllIndicatorsMissing { pillar, date })?;

    Ok(PillarAggregate {
        pillar,
        score: score.clamp(0.0, 1.0),
        weights: present
            .iter()
            .map(|m| (m.indicator.clone(), m.weight / total))
            .collect(),
        missing: missing.iter().map(|m| m.indicator.clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2008, 9, 15).unwrap()
    }

    #[test]
    fn weighted_average_of_full_pillar() {
        let members = vec![
            MemberScore::new("ted", 0.5, Some(0.8)),
            MemberScore::new("ois", 0.3, Some(0.4)),
            MemberScore::new("repo", 0.2, Some(0.1)),
        ];
        let agg = aggregate_pillar(Pillar::Liquidity, date(), &members).unwrap();
        let expected = 0.5 * 0.8 + 0.3 * 0.4 + 0.2 * 0.1;
        assert!((agg.score - expected).abs() < 1e-12);
        assert!(agg.missing.is_empty());
    }

    #[test]
    fn missing_member_renormalizes() {
        let members = vec![
            MemberScore::new("ted", 0.5, Some(0.8)),
            MemberScore::new("ois", 0.3, None),
            MemberScore::new("repo", 0.2, Some(0.1)),
        ];
        let agg = aggregate_pillar(Pillar::Liquidity, date(), &members).unwrap();
        let expected = (0.5 * 0.8 + 0.2 * 0.1) / 0.7;
        assert!((agg.score - expected).abs() < 1e-12);
        assert_eq!(agg.missing, vec![IndicatorId::from("ois")]);
        let weight_sum: f64 = agg.weights.iter().map(|(_, w)| w).sum();
        assert!((weight_sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_is_not_zero_stress() {
        let members = vec![
            MemberScore::new("a", 0.5, Some(0.9)),
            MemberScore::new("b", 0.5, None),
        ];
        let agg = aggregate_pillar(Pillar::Valuation, date(), &members).unwrap();
        assert!((agg.score - 0.9).abs() < 1e-12);
    }

    #[test]
    fn all_missing_fails() {
        let members = vec![
            MemberScore::new("a", 0.5, None),
            MemberScore::new("b", 0.5, None),
        ];
        let err = aggregate_pillar(Pillar::Policy, date(), &members).unwrap_err();
        assert_eq!(
            err,
            MacError::AllIndicatorsMissing {
                pillar: Pillar::Policy,
                date: date()
            }
        );
    }

    #[test]
    fn empty_pillar_fails() {
        assert!(aggregate_pillar(Pillar::Policy, date(), &[]).is_err());
    }

    #[test]
    fn order_invariant() {
        let a = vec![
            MemberScore::new("x", 0.1, Some(0.3)),
            MemberScore::new("y", 0.7, Some(0.6)),
            MemberScore::new("z", 0.2, Some(0.9)),
        ];
        let mut b = a.clone();
        b.reverse();
        let sa = aggregate_pillar(Pillar::Volatility, date(), &a).unwrap();
        let sb = aggregate_pillar(Pillar::Volatility, date(), &b).unwrap();
        assert_eq!(sa.score.to_bits(), sb.score.to_bits());
    }

    #[test]
    fn renormalize_is_idempotent() {
        let once = renormalize(&[0.2, 0.3, 0.1]);
        let twice = renormalize(&once);
        for (a, b) in once.iter().zip(&twice) {
            assert!((a - b).abs() < 1e-15);
        }
        assert_eq!(renormalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
