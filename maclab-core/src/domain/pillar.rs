//! Pillar — the six fixed stress categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six fixed stress categories.
///
/// The declaration order is the canonical order used for fixed-size arrays
/// and for every report that lists pillars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Liquidity,
    Valuation,
    Positioning,
    Volatility,
    Policy,
    InternationalContagion,
}

impl Pillar {
    pub const COUNT: usize = 6;

    pub const ALL: [Pillar; Pillar::COUNT] = [
        Pillar::Liquidity,
        Pillar::Valuation,
        Pillar::Positioning,
        Pillar::Volatility,
        Pillar::Policy,
        Pillar::InternationalContagion,
    ];

    /// Position of this pillar in `Pillar::ALL`.
    pub fn index(self) -> usize {
        match self {
            Pillar::Liquidity => 0,
            Pillar::Valuation => 1,
            Pillar::Positioning => 2,
            Pillar::Volatility => 3,
            Pillar::Policy => 4,
            Pillar::InternationalContagion => 5,
        }
    }

    /// Snake-case name, identical to the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            Pillar::Liquidity => "liquidity",
            Pillar::Valuation => "valuation",
            Pillar::Positioning => "positioning",
            Pillar::Volatility => "volatility",
            Pillar::Policy => "policy",
            Pillar::InternationalContagion => "international_contagion",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
