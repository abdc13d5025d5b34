//! Domain types for the MAC engine.

pub mod episode;
pub mod indicator;
pub mod observation;
pub mod pillar;
pub mod regime;
pub mod snapshot;

pub use episode::CrisisEpisode;
pub use indicator::IndicatorId;
pub use observation::Observation;
pub use pillar::Pillar;
pub use regime::{Regime, RegimeThresholds};
pub use snapshot::{
    CompositeSnapshot, ExclusionReason, Exclusions, IndicatorExclusion, PillarReading,
    PillarStatus,
};
