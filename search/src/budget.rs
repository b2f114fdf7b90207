//! Search budgets.
//!
//! Every enumerative search runs under an explicit depth, step-count and
//! wall-clock budget. A zero in any of them counts as missing and is
//! rejected by `validate()` before the search takes a step.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Default cadence for wall-clock and cancellation checks.
pub const DEFAULT_CHECK_INTERVAL: u64 = 1_000;

/// Budget for the local chain cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBudgetV1 {
    /// Longest pipeline generated.
    pub max_depth: usize,
    /// Hard cap on candidates generated.
    pub max_candidates: u64,
    /// Wall-clock ceiling.
    #[serde(with = "millis")]
    pub time_limit: Duration,
}

impl ChainBudgetV1 {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidBudget`] if any field is zero.
    pub fn validate(&self) -> Result<(), SearchError> {
        require(self.max_depth > 0, "chain max_depth")?;
        require(self.max_candidates > 0, "chain max_candidates")?;
        require(!self.time_limit.is_zero(), "chain time_limit")
    }
}

impl Default for ChainBudgetV1 {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_candidates: 20_000,
            time_limit: Duration::from_secs(5),
        }
    }
}

/// Budget for the beam + depth-first hybrid search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridBudgetV1 {
    /// Beam levels; the depth-first phase may go to twice this.
    pub max_depth: usize,
    /// Hard cap on candidate pipelines tried.
    pub max_steps: u64,
    /// Wall-clock ceiling.
    #[serde(with = "millis")]
    pub time_limit: Duration,
    /// Frontier states kept per level.
    pub beam_width: usize,
    /// Steps between wall-clock / cancellation checks and progress events.
    pub check_interval: u64,
    /// Steps between checkpoints.
    pub checkpoint_interval: u64,
}

impl HybridBudgetV1 {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidBudget`] if any field is zero.
    pub fn validate(&self) -> Result<(), SearchError> {
        require(self.max_depth > 0, "hybrid max_depth")?;
        require(self.max_steps > 0, "hybrid max_steps")?;
        require(!self.time_limit.is_zero(), "hybrid time_limit")?;
        require(self.beam_width > 0, "hybrid beam_width")?;
        require(self.check_interval > 0, "hybrid check_interval")?;
        require(self.checkpoint_interval > 0, "hybrid checkpoint_interval")
    }
}

impl Default for HybridBudgetV1 {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_steps: 200_000,
            time_limit: Duration::from_secs(20),
            beam_width: 32,
            check_interval: DEFAULT_CHECK_INTERVAL,
            checkpoint_interval: 10_000,
        }
    }
}

fn require(ok: bool, field: &str) -> Result<(), SearchError> {
    if ok {
        Ok(())
    } else {
        Err(SearchError::InvalidBudget {
            detail: format!("{field} is missing or zero"),
        })
    }
}

/// `Duration` as integer milliseconds.
pub mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
