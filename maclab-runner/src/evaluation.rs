//! Early-warning evaluation — lead times, false positives, regime statistics.
//!
//! Every metric is a pure function of the snapshot series, the evaluation
//! timeline, and the reference episodes. No dependency on the store or model.
//!
//! A snapshot is an *alert* when its regime is Stretched or worse. An
//! episode's warning window is `[start - W, end]`, or `[start - W, start)` when
//! the episode span itself is excluded.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use maclab_core::{CompositeSnapshot, CrisisEpisode, Regime};

/// Per-episode early-warning outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub episode: CrisisEpisode,
    /// First alert inside the warning window.
    pub first_warning: Option<NaiveDate>,
    /// Calendar days from the first alert to the episode start. Positive
    /// means the alert came before the start.
    pub lead_days: Option<i64>,
    /// Evaluation steps from the first alert to the episode start.
    pub lead_steps: Option<i64>,
    /// Highest regime reached inside the warning window.
    pub peak_regime: Option<Regime>,
}

impl EpisodeOutcome {
    /// True when an alert fired strictly before the episode start.
    pub fn warned_in_advance(&self) -> bool {
        self.lead_days.is_some_and(|d| d > 0)
    }
}

/// Time share and mean composite for one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeStats {
    pub regime: Regime,
    pub steps: usize,
    pub time_share: f64,
    pub mean_composite: Option<f64>,
}

/// Aggregate early-warning metrics for one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub warning_window_days: u32,
    pub include_episode_in_window: bool,
    pub episodes: Vec<EpisodeOutcome>,
    pub evaluated_steps: usize,
    pub alert_count: usize,
    pub false_positive_count: usize,
    /// False positives over evaluated snapshots; 0 when nothing was evaluated.
    pub false_positive_rate: f64,
    /// Episodes warned strictly in advance over all episodes.
    pub hit_rate: Option<f64>,
    pub mean_lead_days: Option<f64>,
    pub median_lead_days: Option<f64>,
    /// One entry per regime, in increasing-stress order.
    pub regimes: Vec<RegimeStats>,
}

impl EvaluationSummary {
    /// Compute all metrics.
    ///
    /// `timeline` is the full evaluation calendar (including steps that
    /// produced no snapshot) and is used for step-based lead times.
    pub fn compute(
        snapshots: &[CompositeSnapshot],
        timeline: &[NaiveDate],
        episodes: &[CrisisEpisode],
        warning_window_days: u32,
        include_episode_in_window: bool,
    ) -> Self {
        let window = WarningWindow {
            days: i64::from(warning_window_days),
            include_episode: include_episode_in_window,
        };

        let outcomes: Vec<EpisodeOutcome> = episodes
            .iter()
            .map(|ep| episode_outcome(snapshots, timeline, ep, window))
            .collect();

        let alert_count = snapshots.iter().filter(|s| s.regime.is_warning()).count();
        let false_positive_count = false_positives(snapshots, episodes, window);

        let leads: Vec<f64> = outcomes
            .iter()
            .filter(|o| o.warned_in_advance())
            .filter_map(|o| o.lead_days)
            .map(|d| d as f64)
            .collect();

        Self {
            warning_window_days,
            include_episode_in_window,
            evaluated_steps: snapshots.len(),
            alert_count,
            false_positive_count,
            false_positive_rate: ratio(false_positive_count, snapshots.len()).unwrap_or(0.0),
            hit_rate: ratio(leads.len(), outcomes.len()),
            mean_lead_days: mean(&leads),
            median_lead_days: median(&leads),
            regimes: regime_stats(snapshots),
            episodes: outcomes,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct WarningWindow {
    days: i64,
    include_episode: bool,
}

impl WarningWindow {
    fn covers(&self, episode: &CrisisEpisode, date: NaiveDate) -> bool {
        episode.in_pre_episode_window(date, self.days)
            || (self.include_episode && episode.contains(date))
    }
}

fn episode_outcome(
    snapshots: &[CompositeSnapshot],
    timeline: &[NaiveDate],
    episode: &CrisisEpisode,
    window: WarningWindow,
) -> EpisodeOutcome {
    let in_window: Vec<&CompositeSnapshot> = snapshots
        .iter()
        .filter(|s| window.covers(episode, s.date))
        .collect();

    let first_warning = in_window
        .iter()
        .find(|s| s.regime.is_warning())
        .map(|s| s.date);
    let peak_regime = in_window.iter().map(|s| s.regime).max();

    EpisodeOutcome {
        episode: episode.clone(),
        first_warning,
        lead_days: first_warning.map(|w| (episode.start - w).num_days()),
        lead_steps: first_warning.map(|w| lead_steps(timeline, w, episode.start)),
        peak_regime,
    }
}

/// Steps between `warning` and `start` on the evaluation timeline. When
/// `start` is not itself an evaluation date, its insertion point is used.
pub fn lead_steps(timeline: &[NaiveDate], warning: NaiveDate, start: NaiveDate) -> i64 {
    let w = timeline.partition_point(|d| *d < warning) as i64;
    let s = timeline.partition_point(|d| *d < start) as i64;
    s - w
}

/// Alerts that fall outside every episode's warning window.
fn false_positives(
    snapshots: &[CompositeSnapshot],
    episodes: &[CrisisEpisode],
    window: WarningWindow,
) -> usize {
    snapshots
        .iter()
        .filter(|s| s.regime.is_warning())
        .filter(|s| !episodes.iter().any(|ep| window.covers(ep, s.date)))
        .count()
}

fn regime_stats(snapshots: &[CompositeSnapshot]) -> Vec<RegimeStats> {
    Regime::ALL
        .iter()
        .map(|&regime| {
            let scores: Vec<f64> = snapshots
                .iter()
                .filter(|s| s.regime == regime)
                .map(|s| s.composite)
                .collect();
            RegimeStats {
                regime,
                steps: scores.len(),
                time_share: ratio(scores.len(), snapshots.len()).unwrap_or(0.0),
                mean_composite: mean(&scores),
            }
        })
        .collect()
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use maclab_core::{CompositeBuilder, PillarInput, Pillar};

    fn day(i: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 1, 1).unwrap() + Duration::days(i)
    }

    fn snap(i: i64, score: f64) -> CompositeSnapshot {
        let mut inputs = [PillarInput::Undefined; Pillar::COUNT];
        inputs[Pillar::Volatility.index()] = PillarInput::Fresh(score);
        CompositeBuilder::default()
            .build(day(i), &inputs, Vec::new())
            .unwrap()
    }

    /// Daily series: calm except for alert days listed in `alerts`.
    fn series(n: i64, alerts: &[i64]) -> (Vec<CompositeSnapshot>, Vec<NaiveDate>) {
        let snaps = (0..n)
            .map(|i| snap(i, if alerts.contains(&i) { 0.6 } else { 0.1 }))
            .collect();
        let timeline = (0..n).map(day).collect();
        (snaps, timeline)
    }

    fn episode() -> CrisisEpisode {
        CrisisEpisode::new("test", day(100), day(110))
    }

    #[test]
    fn lead_time_five_days() {
        let alerts: Vec<i64> = (95..=110).collect();
        let (snaps, timeline) = series(130, &alerts);
        let summary = EvaluationSummary::compute(&snaps, &timeline, &[episode()], 60, true);
        let out = &summary.episodes[0];
        assert_eq!(out.first_warning, Some(day(95)));
        assert_eq!(out.lead_days, Some(5));
        assert_eq!(out.lead_steps, Some(5));
        assert!(out.warned_in_advance());
        assert_eq!(out.peak_regime, Some(Regime::Stretched));
        assert_eq!(summary.hit_rate, Some(1.0));
        assert_eq!(summary.mean_lead_days, Some(5.0));
        assert_eq!(summary.false_positive_count, 0);
    }

    #[test]
    fn no_warning_means_no_lead_time() {
        let (snaps, timeline) = series(130, &[]);
        let summary = EvaluationSummary::compute(&snaps, &timeline, &[episode()], 60, true);
        let out = &summary.episodes[0];
        assert_eq!(out.first_warning, None);
        assert_eq!(out.lead_days, None);
        assert!(!out.warned_in_advance());
        assert_eq!(summary.hit_rate, Some(0.0));
        assert_eq!(summary.mean_lead_days, None);
    }

    #[test]
    fn late_warning_is_non_positive() {
        let (snaps, timeline) = series(130, &[103]);
        let summary = EvaluationSummary::compute(&snaps, &timeline, &[episode()], 60, true);
        let out = &summary.episodes[0];
        assert_eq!(out.lead_days, Some(-3));
        assert_eq!(out.lead_steps, Some(-3));
        assert!(!out.warned_in_advance());

        let strict = EvaluationSummary::compute(&snaps, &timeline, &[episode()], 60, false);
        assert_eq!(strict.episodes[0].lead_days, None);
        assert_eq!(strict.false_positive_count, 1);
    }

    #[test]
    fn warning_outside_window_is_false_positive() {
        // day 10 is 90 days before the start, outside a 60-day window
        let (snaps, timeline) = series(130, &[10, 11, 98]);
        let summary = EvaluationSummary::compute(&snaps, &timeline, &[episode()], 60, true);
        assert_eq!(summary.alert_count, 3);
        assert_eq!(summary.false_positive_count, 2);
        assert!((summary.false_positive_rate - 2.0 / 130.0).abs() < 1e-12);
        assert_eq!(summary.episodes[0].lead_days, Some(2));
    }

    #[test]
    fn window_boundary_is_inclusive_of_warning_start() {
        let (snaps, timeline) = series(130, &[40]);
        let summary = EvaluationSummary::compute(&snaps, &timeline, &[episode()], 60, true);
        assert_eq!(summary.episodes[0].lead_days, Some(60));
        assert_eq!(summary.false_positive_count, 0);
    }

    #[test]
    fn sparse_timeline_lead_steps() {
        // weekly evaluation: day 91 and day 98 are steps before day 105
        let timeline: Vec<NaiveDate> = (0..20).map(|i| day(i * 7)).collect();
        let snaps: Vec<CompositeSnapshot> = (0..20)
            .map(|i| snap(i * 7, if i * 7 >= 91 { 0.8 } else { 0.0 }))
            .collect();
        let summary = EvaluationSummary::compute(&snaps, &timeline, &[episode()], 30, true);
        let out = &summary.episodes[0];
        assert_eq!(out.first_warning, Some(day(91)));
        assert_eq!(out.lead_days, Some(9));
        // day 100 would sit between day 98 (index 14) and day 105 (index 15)
        assert_eq!(out.lead_steps, Some(2));
        assert_eq!(out.peak_regime, Some(Regime::Critical));
    }

    #[test]
    fn empty_inputs_are_zero_not_nan() {
        let summary = EvaluationSummary::compute(&[], &[], &[], 60, true);
        assert_eq!(summary.false_positive_rate, 0.0);
        assert_eq!(summary.hit_rate, None);
        assert!(summary.regimes.iter().all(|r| r.time_share == 0.0));
    }

    #[test]
    fn regime_shares_sum_to_one() {
        let (snaps, _) = series(50, &[1, 2, 3]);
        let stats = regime_stats(&snaps);
        let total: f64 = stats.iter().map(|r| r.time_share).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(stats[0].steps, 47);
        assert_eq!(stats[2].steps, 3);
        assert!((stats[2].mean_composite.unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn median_of_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }
}
