use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::Point;
use crate::error::Result;

/// Editing mode of a proof session
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum Mode {
    /// Free structural editing
    #[default]
    Create,
    /// Structural moves are restricted to legal proof steps
    Proof,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Create => write!(f, "Create"),
            Self::Proof => write!(f, "Proof"),
        }
    }
}

/// Settings for a [`crate::proof::ProofState`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mode the session starts in
    pub mode: Mode,
    /// Where the root bubble sits
    pub root_position: Point,
    /// Squared drag speed above which a grabbed bubble is yanked out of its
    /// parent
    pub yank_speed_squared: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Create,
            root_position: Point::default(),
            yank_speed_squared: 400,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON (missing fields take defaults)
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
