//! Discriminated search events.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_kernel::Pipeline;

/// Which part of the hybrid engine produced a win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    /// A memory-recall seed validated directly.
    Recall,
    /// Level-synchronous beam expansion.
    Beam,
    /// Depth-first continuation from the final beam frontier.
    Depth,
}

impl SearchPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recall => "recall",
            Self::Beam => "beam",
            Self::Depth => "depth",
        }
    }
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event of a hybrid search. Exactly one terminal event ends a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SearchEvent {
    /// A candidate improved on the best cell accuracy seen so far.
    Candidate {
        pipeline: Pipeline,
        cell_accuracy: f64,
        steps: u64,
    },
    /// Emitted at every safety-valve check.
    Progress {
        phase: SearchPhase,
        depth: usize,
        steps: u64,
        frontier: usize,
        #[serde(with = "crate::budget::millis")]
        elapsed: Duration,
    },
    /// A pipeline validated against every training pair.
    Win {
        pipeline: Pipeline,
        phase: SearchPhase,
        steps: u64,
        /// `Some(true)` when the convergence collaborator kept every
        /// training output fixed; `None` when stabilization is disabled.
        stabilized: Option<bool>,
    },
    /// The wall-clock limit passed.
    Timeout { steps: u64 },
    /// The step ceiling was reached.
    Limit { steps: u64 },
    /// The space within the depth bound was exhausted.
    None { steps: u64 },
    /// The cancellation token fired.
    Cancelled { steps: u64 },
}

impl SearchEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Candidate { .. } | Self::Progress { .. })
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Candidate { .. } => "candidate",
            Self::Progress { .. } => "progress",
            Self::Win { .. } => "win",
            Self::Timeout { .. } => "timeout",
            Self::Limit { .. } => "limit",
            Self::None { .. } => "none",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}
