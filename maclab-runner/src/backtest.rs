//! Backtest engine — replays observations through the model one date at a time.
//!
//! Dates are processed in strictly increasing order. The snapshot at date T
//! reads only observations dated on or before T; percentile windows are
//! trailing-only. Pillars at one date may be scored on the rayon pool, which
//! never changes results.
//!
//! Two controls:
//! - `missing_pillar`: drop undefined pillars, or carry the last score forward
//!   for a bounded number of steps.
//! - `chronology`: abort on an out-of-order indicator, or quarantine it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use maclab_core::{
    ChronologyPolicy, CompositeSnapshot, ConfigFingerprint, CrisisEpisode, MacError, MacModel,
    Observation, ObservationStore, Pillar, PillarEvaluation, PillarInput, QuarantinedIndicator,
};

use crate::evaluation::EvaluationSummary;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

// ─── Settings ────────────────────────────────────────────────────────

/// Which dates the backtest evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationCalendar {
    /// Every date on which any indicator has an observation.
    #[default]
    Observations,
    /// Every calendar day. Open bounds default to the observed date range.
    Daily {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<NaiveDate>,
    },
}

/// What happens to a pillar that has no usable member at a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MissingPillarPolicy {
    /// Exclude the pillar and renormalize the remaining weights.
    #[default]
    Exclude,
    /// Reuse the last fresh score for up to `max_steps` consecutive steps.
    CarryForward { max_steps: usize },
}

fn default_warning_window() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

/// Backtest settings, read from the `[backtest]` table of the model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Days before an episode start in which an alert counts as a warning.
    #[serde(default = "default_warning_window")]
    pub warning_window_days: u32,
    /// Count alerts during the episode itself as inside the window.
    #[serde(default = "default_true")]
    pub include_episode_in_window: bool,
    #[serde(default)]
    pub chronology: ChronologyPolicy,
    /// Score the six pillars of each date on the rayon pool.
    #[serde(default)]
    pub parallel_pillars: bool,
    #[serde(default)]
    pub calendar: EvaluationCalendar,
    #[serde(default)]
    pub missing_pillar: MissingPillarPolicy,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            warning_window_days: default_warning_window(),
            include_episode_in_window: true,
            chronology: ChronologyPolicy::default(),
            parallel_pillars: false,
            calendar: EvaluationCalendar::default(),
            missing_pillar: MissingPillarPolicy::default(),
        }
    }
}

impl BacktestSettings {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if let EvaluationCalendar::Daily {
            start: Some(start),
            end: Some(end),
        } = self.calendar
        {
            if start > end {
                return Err(BacktestError::Settings(format!(
                    "calendar start {start} is after end {end}"
                )));
            }
        }
        if let MissingPillarPolicy::CarryForward { max_steps: 0 } = self.missing_pillar {
            return Err(BacktestError::Settings(
                "carry_forward.max_steps must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Read the `[backtest]` table from a model TOML file. A missing table
    /// yields the defaults.
    pub fn from_toml(content: &str) -> Result<Self, BacktestError> {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(default)]
            backtest: BacktestSettings,
        }
        let wrapper: Wrapper =
            toml::from_str(content).map_err(|e| BacktestError::Settings(e.to_string()))?;
        wrapper.backtest.validate()?;
        Ok(wrapper.backtest)
    }

    /// Render as a standalone `[backtest]` table.
    pub fn to_toml(&self) -> Result<String, BacktestError> {
        #[derive(Serialize)]
        struct Wrapper<'a> {
            backtest: &'a BacktestSettings,
        }
        toml::to_string_pretty(&Wrapper { backtest: self })
            .map_err(|e| BacktestError::Settings(e.to_string()))
    }
}

// ─── Progress, report & error types ──────────────────────────────────

/// Progress update sent after every completed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestProgress {
    pub date: NaiveDate,
    pub steps_complete: usize,
    pub steps_total: usize,
    pub snapshots: usize,
    pub skipped: usize,
    pub elapsed_secs: f64,
}

/// Complete result of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_fingerprint: ConfigFingerprint,
    /// BLAKE3 over every observation that entered the store.
    pub dataset_hash: String,
    pub settings: BacktestSettings,
    pub snapshots: Vec<CompositeSnapshot>,
    /// Dates on which every pillar was undefined.
    pub skipped: Vec<NaiveDate>,
    pub quarantined: Vec<QuarantinedIndicator>,
    pub evaluation: EvaluationSummary,
    pub steps_total: usize,
    pub steps_completed: usize,
    /// True when the run stopped early on the cancel flag. Everything up to
    /// `steps_completed` is still valid.
    pub cancelled: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestReport {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.snapshots.first().map(|s| s.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.snapshots.last().map(|s| s.date)
    }
}

/// Errors from the backtest engine.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error(transparent)]
    Mac(#[from] MacError),
    #[error("invalid backtest settings: {0}")]
    Settings(String),
    #[error("no observations to evaluate")]
    NoObservations,
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Model plus ingested observations, ready to evaluate any date.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    model: MacModel,
    store: ObservationStore,
    settings: BacktestSettings,
}

impl BacktestEngine {
    /// Ingest `observations` under the configured chronology policy.
    pub fn new(
        model: MacModel,
        observations: Vec<Observation>,
        settings: BacktestSettings,
    ) -> Result<Self, BacktestError> {
        settings.validate()?;
        let store = ObservationStore::ingest(observations, settings.chronology)?;
        Ok(Self {
            model,
            store,
            settings,
        })
    }

    pub fn model(&self) -> &MacModel {
        &self.model
    }

    pub fn store(&self) -> &ObservationStore {
        &self.store
    }

    pub fn settings(&self) -> &BacktestSettings {
        &self.settings
    }

    /// Score a single date with undefined pillars excluded.
    pub fn evaluate_at(&self, date: NaiveDate) -> Result<CompositeSnapshot, MacError> {
        self.model.evaluate(&self.store, date)
    }

    /// Evaluation dates in increasing order.
    pub fn timeline(&self) -> Result<Vec<NaiveDate>, BacktestError> {
        match self.settings.calendar {
            EvaluationCalendar::Observations => {
                let dates = self.store.observation_dates();
                if dates.is_empty() {
                    return Err(BacktestError::NoObservations);
                }
                Ok(dates)
            }
            EvaluationCalendar::Daily { start, end } => {
                let range = self.store.date_range();
                let start = start
                    .or(range.map(|r| r.0))
                    .ok_or(BacktestError::NoObservations)?;
                let end = end
                    .or(range.map(|r| r.1))
                    .ok_or(BacktestError::NoObservations)?;
                let days = (end - start).num_days().max(-1) + 1;
                Ok((0..days).map(|i| start + Duration::days(i)).collect())
            }
        }
    }

    fn evaluate_pillars(&self, date: NaiveDate) -> Vec<PillarEvaluation> {
        if self.settings.parallel_pillars {
            Pillar::ALL
                .par_iter()
                .map(|&p| self.model.evaluate_pillar(&self.store, p, date))
                .collect()
        } else {
            self.model.evaluate_pillars(&self.store, date)
        }
    }

    /// Run the backtest over the full timeline.
    ///
    /// # Arguments
    /// - `episodes`: reference crisis windows for lead-time evaluation.
    /// - `progress_cb`: optional callback invoked after every step.
    /// - `cancel`: optional atomic flag, checked between steps.
    pub fn run(
        &self,
        episodes: &[CrisisEpisode],
        progress_cb: Option<&dyn Fn(&BacktestProgress)>,
        cancel: Option<&AtomicBool>,
    ) -> Result<BacktestReport, BacktestError> {
        let timeline = self.timeline()?;
        let start_time = Instant::now();
        info!(
            fingerprint = self.model.fingerprint().short(),
            steps = timeline.len(),
            indicators = self.model.indicators().len(),
            observations = self.store.len(),
            "starting backtest"
        );

        let mut carry = CarryState::default();
        let mut snapshots = Vec::with_capacity(timeline.len());
        let mut skipped = Vec::new();
        let mut completed = 0usize;
        let mut cancelled = false;

        for &date in &timeline {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                warn!(%date, completed, "backtest cancelled");
                cancelled = true;
                break;
            }

            let evaluations = self.evaluate_pillars(date);
            let inputs = carry.resolve(&evaluations, self.settings.missing_pillar);

            match self.model.assemble(date, &evaluations, &inputs) {
                Ok(snapshot) => {
                    if !snapshot.exclusions.pillars.is_empty() {
                        debug!(
                            %date,
                            excluded = ?snapshot.exclusions.pillars,
                            "pillars excluded"
                        );
                    }
                    snapshots.push(snapshot);
                }
                Err(MacError::NoDataAvailable { .. }) => {
                    debug!(%date, "no pillar defined, step skipped");
                    skipped.push(date);
                }
                Err(e) => return Err(e.into()),
            }
            completed += 1;

            if let Some(cb) = progress_cb {
                cb(&BacktestProgress {
                    date,
                    steps_complete: completed,
                    steps_total: timeline.len(),
                    snapshots: snapshots.len(),
                    skipped: skipped.len(),
                    elapsed_secs: start_time.elapsed().as_secs_f64(),
                });
            }
        }

        let evaluation = EvaluationSummary::compute(
            &snapshots,
            &timeline,
            episodes,
            self.settings.warning_window_days,
            self.settings.include_episode_in_window,
        );

        info!(
            snapshots = snapshots.len(),
            skipped = skipped.len(),
            alerts = evaluation.alert_count,
            false_positive_rate = evaluation.false_positive_rate,
            elapsed_secs = start_time.elapsed().as_secs_f64(),
            "backtest finished"
        );

        Ok(BacktestReport {
            schema_version: SCHEMA_VERSION,
            config_fingerprint: self.model.fingerprint().clone(),
            dataset_hash: self.store.content_hash(),
            settings: self.settings.clone(),
            snapshots,
            skipped,
            quarantined: self.store.quarantined().to_vec(),
            evaluation,
            steps_total: timeline.len(),
            steps_completed: completed,
            cancelled,
        })
    }
}

/// Ingest, run, and evaluate in one call.
pub fn run_backtest(
    model: &MacModel,
    observations: Vec<Observation>,
    episodes: &[CrisisEpisode],
    settings: &BacktestSettings,
    progress_cb: Option<&dyn Fn(&BacktestProgress)>,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestReport, BacktestError> {
    BacktestEngine::new(model.clone(), observations, settings.clone())?.run(
        episodes,
        progress_cb,
        cancel,
    )
}

// ─── Carry-forward state ─────────────────────────────────────────────

/// Last fresh score per pillar and how many steps it has been reused.
#[derive(Debug, Default)]
struct CarryState {
    last: [Option<(f64, usize)>; Pillar::COUNT],
}

impl CarryState {
    fn resolve(
        &mut self,
        evaluations: &[PillarEvaluation],
        policy: MissingPillarPolicy,
    ) -> [PillarInput; Pillar::COUNT] {
        let mut inputs = [PillarInput::Undefined; Pillar::COUNT];
        for eval in evaluations {
            let i = eval.pillar.index();
            let previous = self.last[i];
            inputs[i] = match (&eval.outcome, policy) {
                (Ok(agg), _) => {
                    self.last[i] = Some((agg.score, 0));
                    PillarInput::Fresh(agg.score)
                }
                (Err(_), MissingPillarPolicy::CarryForward { max_steps }) => match previous {
                    Some((score, age)) if age < max_steps => {
                        self.last[i] = Some((score, age + 1));
                        PillarInput::CarriedForward {
                            score,
                            age: age + 1,
                        }
                    }
                    _ => {
                        self.last[i] = None;
                        PillarInput::Undefined
                    }
                },
                (Err(_), MissingPillarPolicy::Exclude) => PillarInput::Undefined,
            };
        }
        inputs
    }
}
