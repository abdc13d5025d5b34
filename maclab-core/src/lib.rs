//! MacLab Core — scoring engine for the Market Absorption Capacity index.
//!
//! This crate turns raw market observations into a composite stress reading:
//! - Domain types (observations, pillars, regimes, snapshots, crisis episodes)
//! - Transfer functions mapping raw values to bounded [0,1] stress scores
//! - Time-ordered observation store with look-ahead-safe history access
//! - Pillar aggregation with renormalization over missing members
//! - Composite builder and regime classification
//! - TOML configuration, validated into an executable `MacModel`

pub mod aggregate;
pub mod composite;
pub mod config;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod scoring;
pub mod store;

pub use aggregate::{aggregate_pillar, renormalize, MemberScore, PillarAggregate};
pub use composite::{CompositeBuilder, PillarInput, PillarWeights};
pub use config::{IndicatorConfig, MacConfig, PillarsConfig};
pub use domain::{
    CompositeSnapshot, CrisisEpisode, ExclusionReason, Exclusions, IndicatorExclusion,
    IndicatorId, Observation, Pillar, PillarReading, PillarStatus, Regime, RegimeThresholds,
};
pub use error::MacError;
pub use fingerprint::ConfigFingerprint;
pub use model::{IndicatorSpec, MacModel, PillarEvaluation};
pub use scoring::{Transfer, TransferError, TransferFunction};
pub use store::{ChronologyPolicy, IndicatorSeries, ObservationStore, QuarantinedIndicator};
