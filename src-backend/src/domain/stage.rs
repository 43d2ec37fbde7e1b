//! Stage
//!
//! A pipeline status bucket. Columns on the board are derived from it.

use serde::{Deserialize, Serialize};

/// Status/category label of a deal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(String);

impl Stage {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The standard sales pipeline, left to right
    pub fn defaults() -> Vec<Stage> {
        ["lead", "qualified", "proposal", "negotiation", "won", "lost"]
            .into_iter()
            .map(Stage::new)
            .collect()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Stage {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Stage {
    fn from(label: String) -> Self {
        Self(label)
    }
}
