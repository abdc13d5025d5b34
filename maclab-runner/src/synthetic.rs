//! Synthetic observation sets for demos, tests, and benchmarks.
//!
//! A single latent stress factor drives one or two indicators per pillar.
//! The factor mean-reverts around a calm level and ramps up ahead of each
//! planted crisis episode, so a working model warns before every episode.
//! Output is fully determined by the seed.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use maclab_core::scoring::{ConvexTransfer, Direction, LinearTransfer, PercentileTransfer};
use maclab_core::{
    CrisisEpisode, IndicatorConfig, MacConfig, Observation, Pillar, PillarsConfig,
    RegimeThresholds, TransferFunction,
};

/// Parameters of a synthetic dataset.
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub start: NaiveDate,
    /// Calendar days covered (weekends produce no observations).
    pub days: i64,
    pub episodes: usize,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2000, 1, 3).unwrap_or_default(),
            days: 3 * 365,
            episodes: 3,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub config: MacConfig,
    pub observations: Vec<Observation>,
    pub episodes: Vec<CrisisEpisode>,
}

const CALM_LEVEL: f64 = 0.15;
const REVERSION: f64 = 0.05;
const SHOCK: f64 = 0.03;
const EPISODE_BUMP: f64 = 0.7;
const RAMP_DAYS: i64 = 30;
const DECAY_DAYS: i64 = 30;
const EPISODE_DAYS: i64 = 20;
const POLICY_EVERY_DAYS: i64 = 7;
const POLICY_WEEKDAY: Weekday = Weekday::Mon;

/// Model configuration matching the indicators `generate` emits.
pub fn demo_config() -> MacConfig {
    fn ind(id: &str, pillar: Pillar, weight: f64, transfer: TransferFunction) -> IndicatorConfig {
        IndicatorConfig {
            id: id.into(),
            pillar,
            unit: None,
            description: None,
            weight,
            as_of_tolerance_days: 0,
            transfer,
        }
    }
    let linear = |lo: f64, hi: f64| {
        TransferFunction::Linear(LinearTransfer {
            bands: [lo, hi],
            direction: Direction::Rising,
        })
    };

    let mut policy = ind("policy_gap", Pillar::Policy, 1.0, linear(0.0, 3.0));
    policy.as_of_tolerance_days = POLICY_EVERY_DAYS as u32;

    MacConfig {
        name: Some("synthetic-demo".into()),
        indicators: vec![
            ind("ted_spread", Pillar::Liquidity, 0.6, linear(20.0, 120.0)),
            ind("fra_ois", Pillar::Liquidity, 0.4, linear(10.0, 80.0)),
            ind("hy_oas", Pillar::Valuation, 1.0, linear(300.0, 900.0)),
            ind(
                "cot_net",
                Pillar::Positioning,
                1.0,
                TransferFunction::PercentileRank(PercentileTransfer::new(250, 60)),
            ),
            ind(
                "vix",
                Pillar::Volatility,
                1.0,
                TransferFunction::Convex(ConvexTransfer::default()),
            ),
            policy,
            ind("em_spread", Pillar::InternationalContagion, 1.0, linear(250.0, 750.0)),
        ],
        pillars: PillarsConfig::default(),
        regime: RegimeThresholds::default(),
    }
}

/// Evenly spaced episodes, leaving room for a full ramp before the first.
fn plant_episodes(spec: &SyntheticSpec) -> Vec<CrisisEpisode> {
    let n = spec.episodes as i64;
    (1..=n)
        .map(|k| {
            let start = spec.start + Duration::days(k * spec.days / (n + 1));
            CrisisEpisode::new(
                format!("synthetic-{k}"),
                start,
                start + Duration::days(EPISODE_DAYS),
            )
        })
        .collect()
}

/// Extra stress contributed by the episodes at `date`.
fn episode_bump(episodes: &[CrisisEpisode], date: NaiveDate) -> f64 {
    episodes
        .iter()
        .map(|ep| {
            let before = (ep.start - date).num_days();
            let after = (date - ep.end).num_days();
            if ep.contains(date) {
                EPISODE_BUMP
            } else if (1..=RAMP_DAYS).contains(&before) {
                EPISODE_BUMP * (1.0 - before as f64 / RAMP_DAYS as f64)
            } else if (1..=DECAY_DAYS).contains(&after) {
                EPISODE_BUMP * (1.0 - after as f64 / DECAY_DAYS as f64)
            } else {
                0.0
            }
        })
        .fold(0.0, f64::max)
}

/// Generate a dataset. Same parameters, same output.
pub fn generate(spec: &SyntheticSpec) -> SyntheticDataset {
    // Derive the RNG seed from the user seed
    let seed_bytes = blake3::hash(&spec.seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

    let episodes = plant_episodes(spec);
    let mut observations = Vec::new();
    let mut latent = CALM_LEVEL;

    for offset in 0..spec.days {
        let date = spec.start + Duration::days(offset);
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }

        latent += REVERSION * (CALM_LEVEL - latent) + rng.gen_range(-SHOCK..SHOCK);
        latent = latent.clamp(0.0, 1.0);
        let s = (latent + episode_bump(&episodes, date)).clamp(0.0, 1.0);

        let mut push = |id: &str, value: f64| observations.push(Observation::new(id, date, value));
        push("ted_spread", 20.0 + 150.0 * s + rng.gen_range(-5.0..5.0));
        push("fra_ois", 10.0 + 90.0 * s + rng.gen_range(-3.0..3.0));
        push("hy_oas", 300.0 + 700.0 * s + rng.gen_range(-20.0..20.0));
        push("cot_net", 100.0 * s + rng.gen_range(-10.0..10.0));
        push("vix", (12.0 + 50.0 * s.powf(1.5) + rng.gen_range(-1.5..1.5)).max(9.0));
        if date.weekday() == POLICY_WEEKDAY {
            push("policy_gap", 3.0 * s);
        }
        push("em_spread", 250.0 + 500.0 * s + rng.gen_range(-15.0..15.0));
    }

    SyntheticDataset {
        config: demo_config(),
        observations,
        episodes,
    }
}
