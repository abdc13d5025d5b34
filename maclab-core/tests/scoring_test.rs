//! End-to-end scoring tests: config text in, snapshots out.

use chrono::{Duration, NaiveDate};
use maclab_core::{
    ExclusionReason, MacConfig, MacError, Observation, ObservationStore, Pillar, Regime,
};

fn day(i: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(i)
}

const VIX_ONLY: &str = r#"
name = "vix-only"

[[indicators]]
id = "vix"
pillar = "volatility"
unit = "index points"

[indicators.transfer]
kind = "convex"
bands = [12.0, 18.0, 28.0, 40.0]
"#;

const FULL: &str = r#"
name = "full"

[[indicators]]
id = "vix"
pillar = "volatility"
[indicators.transfer]
kind = "convex"

[[indicators]]
id = "ted_spread"
pillar = "liquidity"
weight = 0.6
[indicators.transfer]
kind = "linear"
bands = [20.0, 120.0]

[[indicators]]
id = "fra_ois"
pillar = "liquidity"
weight = 0.4
[indicators.transfer]
kind = "linear"
bands = [10.0, 80.0]

[[indicators]]
id = "hy_oas"
pillar = "valuation"
[indicators.transfer]
kind = "linear"
bands = [300.0, 900.0]

[[indicators]]
id = "cot_es"
pillar = "positioning"
[indicators.transfer]
kind = "percentile_rank"
lookback = 20
min_history = 10

[[indicators]]
id = "policy_rate_gap"
pillar = "policy"
as_of_tolerance_days = 31
[indicators.transfer]
kind = "linear"
bands = [0.0, 3.0]

[[indicators]]
id = "usd_funding_depth"
pillar = "international_contagion"
[indicators.transfer]
kind = "linear"
bands = [50.0, 150.0]
direction = "falling"

[pillars.weights]
liquidity = 2.0
"#;

#[test]
fn vix_path_walks_through_regimes() {
    let model = MacConfig::from_toml(VIX_ONLY).unwrap().validate().unwrap();
    let path = [15.0, 15.0, 32.0, 45.0, 32.0, 15.0];
    let store = ObservationStore::from_observations(
        path.iter()
            .enumerate()
            .map(|(i, &v)| Observation::new("vix", day(i as i64), v)),
    )
    .unwrap();

    let regimes: Vec<Regime> = (0..path.len())
        .map(|i| model.evaluate(&store, day(i as i64)).unwrap().regime)
        .collect();
    assert_eq!(
        regimes,
        vec![
            Regime::Ample,
            Regime::Ample,
            Regime::Stretched,
            Regime::Critical,
            Regime::Stretched,
            Regime::Ample,
        ]
    );
}

#[test]
fn single_pillar_composite_equals_pillar_score() {
    let model = MacConfig::from_toml(VIX_ONLY).unwrap().validate().unwrap();
    let store =
        ObservationStore::from_observations(vec![Observation::new("vix", day(0), 22.0)]).unwrap();
    let snap = model.evaluate(&store, day(0)).unwrap();
    let vol = snap.pillar_score(Pillar::Volatility).unwrap();
    assert!((snap.composite - vol).abs() < 1e-12);
    assert_eq!(snap.exclusions.pillars.len(), 5);
    let reading = snap.reading(Pillar::Volatility).unwrap();
    assert!((reading.effective_weight - 1.0).abs() < 1e-12);
}

#[test]
fn full_model_combines_all_pillars() {
    let model = MacConfig::from_toml(FULL).unwrap().validate().unwrap();
    let mut obs = Vec::new();
    for i in 0..15 {
        obs.push(Observation::new("cot_es", day(i), i as f64));
    }
    let t = day(14);
    obs.extend([
        Observation::new("vix", t, 18.0),
        Observation::new("ted_spread", t, 70.0),
        Observation::new("fra_ois", t, 45.0),
        Observation::new("hy_oas", t, 600.0),
        Observation::new("policy_rate_gap", day(0), 1.5),
        Observation::new("usd_funding_depth", t, 100.0),
    ]);
    let store = ObservationStore::from_observations(obs).unwrap();
    let snap = model.evaluate(&store, t).unwrap();

    assert!(snap.is_complete(), "unexpected exclusions: {:?}", snap.exclusions);
    assert!((snap.pillar_score(Pillar::Volatility).unwrap() - 0.25).abs() < 1e-12);
    assert!((snap.pillar_score(Pillar::Liquidity).unwrap() - 0.5).abs() < 1e-12);
    assert!((snap.pillar_score(Pillar::Valuation).unwrap() - 0.5).abs() < 1e-12);
    assert!((snap.pillar_score(Pillar::Policy).unwrap() - 0.5).abs() < 1e-12);
    assert!((snap.pillar_score(Pillar::InternationalContagion).unwrap() - 0.5).abs() < 1e-12);
    // cot at its window maximum is crowded
    assert!(snap.pillar_score(Pillar::Positioning).unwrap() >= 0.5);

    let weight_sum: f64 = snap.pillars.iter().map(|r| r.effective_weight).sum();
    assert!((weight_sum - 1.0).abs() < 1e-9);
    let liq = snap.reading(Pillar::Liquidity).unwrap();
    assert!((liq.effective_weight - 2.0 / 7.0).abs() < 1e-12);
}

#[test]
fn stale_observation_outside_tolerance_is_missing() {
    let model = MacConfig::from_toml(FULL).unwrap().validate().unwrap();
    let store = ObservationStore::from_observations(vec![
        Observation::new("policy_rate_gap", day(0), 1.5),
        Observation::new("vix", day(40), 15.0),
    ])
    .unwrap();
    let snap = model.evaluate(&store, day(40)).unwrap();
    assert!(snap.exclusions.pillars.contains(&Pillar::Policy));
    assert!(snap.exclusions.indicators.iter().any(|e| {
        e.indicator.as_str() == "policy_rate_gap" && e.reason == ExclusionReason::Missing
    }));
}

#[test]
fn huge_tolerance_accepts_any_prior_observation() {
    let text = VIX_ONLY.replace(
        "unit = \"index points\"",
        "unit = \"index points\"\nas_of_tolerance_days = 4000000000",
    );
    let model = MacConfig::from_toml(&text).unwrap().validate().unwrap();
    let store =
        ObservationStore::from_observations(vec![Observation::new("vix", day(0), 15.0)]).unwrap();

    let snap = model.evaluate(&store, day(400)).unwrap();
    assert_eq!(snap.regime, Regime::Ample);
    assert!(snap.exclusions.indicators.is_empty());
}

#[test]
fn missing_member_renormalizes_within_pillar() {
    let model = MacConfig::from_toml(FULL).unwrap().validate().unwrap();
    let store = ObservationStore::from_observations(vec![Observation::new(
        "ted_spread",
        day(0),
        120.0,
    )])
    .unwrap();
    let snap = model.evaluate(&store, day(0)).unwrap();
    assert_eq!(snap.pillar_score(Pillar::Liquidity), Some(1.0));
    assert_eq!(snap.composite, 1.0);
    assert_eq!(snap.regime, Regime::Critical);
}

#[test]
fn nothing_observed_is_no_data() {
    let model = MacConfig::from_toml(FULL).unwrap().validate().unwrap();
    let store = ObservationStore::new();
    assert_eq!(
        model.evaluate(&store, day(0)).unwrap_err(),
        MacError::NoDataAvailable { date: day(0) }
    );
}

#[test]
fn invalid_config_is_rejected() {
    let bad = VIX_ONLY.replace("[12.0, 18.0, 28.0, 40.0]", "[12.0, 28.0, 18.0, 40.0]");
    let err = MacConfig::from_toml(&bad).unwrap().validate().unwrap_err();
    assert!(matches!(err, MacError::Configuration { .. }));
}

#[test]
fn snapshot_serializes_to_json() {
    let model = MacConfig::from_toml(VIX_ONLY).unwrap().validate().unwrap();
    let store =
        ObservationStore::from_observations(vec![Observation::new("vix", day(0), 45.0)]).unwrap();
    let snap = model.evaluate(&store, day(0)).unwrap();
    let json = serde_json::to_string(&snap).unwrap();
    assert!(json.contains("\"regime\":\"critical\""));
    let back: maclab_core::CompositeSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
}
