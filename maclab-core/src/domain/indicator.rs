//! Indicator identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an indicator series (e.g. "vix", "ig_oas").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorId(pub String);

impl IndicatorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IndicatorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IndicatorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
