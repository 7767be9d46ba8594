//! Identifiers for persisted pipeline runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for one pipeline run.
///
/// Uses UUID v4 internally; the first eight characters double as a short
/// handle on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Length of the textual form.
    pub const FULL_LEN: usize = 36;

    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get a short representation (first 8 characters).
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = RunIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < Self::FULL_LEN {
            return Err(RunIdError::ShortFormNotSupported);
        }

        let uuid = Uuid::parse_str(s).map_err(|_| RunIdError::InvalidFormat(s.to_string()))?;
        Ok(Self(uuid))
    }
}

/// Error type for RunId parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunIdError {
    #[error("invalid run ID format: {0}")]
    InvalidFormat(String),
    #[error("short run IDs must be resolved against the run store")]
    ShortFormNotSupported,
}
