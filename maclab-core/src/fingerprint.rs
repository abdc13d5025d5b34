//! Configuration fingerprinting.
//!
//! A fingerprint is the BLAKE3 hash of the canonical JSON form of a
//! configuration. Field order is fixed by the struct definitions, so equal
//! configurations always hash equally.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFingerprint(pub String);

impl ConfigFingerprint {
    pub fn of<T: Serialize + fmt::Debug>(value: &T) -> Self {
        let bytes = serde_json::to_vec(value).unwrap_or_else(|_| format!("{value:?}").into_bytes());
        Self(blake3::hash(&bytes).to_hex().to_string())
    }

    /// First 12 hex characters, for file names and log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
