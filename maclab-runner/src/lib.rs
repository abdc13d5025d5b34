//! MacLab Runner — backtest orchestration, early-warning evaluation, export.
//!
//! This crate builds on `maclab-core` to provide:
//! - Input loading (TOML config, observation CSV, episode CSV/TOML)
//! - Time-step backtest engine with cancellation and progress callbacks
//! - Lead-time, false-positive, and regime statistics per run
//! - JSON/CSV/Markdown artifacts with schema versioning
//! - Deterministic synthetic datasets for demos and benchmarks

pub mod backtest;
pub mod data_loader;
pub mod evaluation;
pub mod export;
pub mod synthetic;

pub use backtest::{
    run_backtest, BacktestEngine, BacktestError, BacktestProgress, BacktestReport,
    BacktestSettings, EvaluationCalendar, MissingPillarPolicy, SCHEMA_VERSION,
};
pub use data_loader::{
    load_config, load_episodes, load_inputs, load_observations_csv, LoadError, LoadedInputs,
};
pub use evaluation::{EpisodeOutcome, EvaluationSummary, RegimeStats};
pub use export::{
    export_json, export_lead_times_csv, export_snapshots_csv, generate_report, import_json,
    load_artifacts, save_artifacts,
};
pub use synthetic::{generate as generate_synthetic, SyntheticDataset, SyntheticSpec};
