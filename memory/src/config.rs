//! Memory store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Capacity, recall thresholds and the optional persistence directory.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Directory holding `memory.json` and `heuristics.json`. `None` keeps
    /// the store purely in memory.
    pub dir: Option<PathBuf>,
    /// Maximum number of entries kept after every distill and save.
    pub capacity: usize,
    /// Recall drops entries whose similarity is below this.
    pub min_similarity: f64,
    /// Maximum number of pipelines one recall returns.
    pub recall_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dir: None,
            capacity: 256,
            min_similarity: 0.75,
            recall_limit: 8,
        }
    }
}

impl MemoryConfig {
    /// In-memory configuration with the given capacity.
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] for a zero capacity or a
    /// similarity threshold outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.capacity == 0 {
            return Err(MemoryError::InvalidConfig {
                detail: "capacity must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(MemoryError::InvalidConfig {
                detail: format!("min_similarity {} outside [0, 1]", self.min_similarity),
            });
        }
        Ok(())
    }
}
