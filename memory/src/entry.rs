//! Memory entries and their score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_kernel::Pipeline;

use crate::fingerprint::Fingerprint;

/// Which escalation phase produced a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Memory,
    Chain,
    Convergence,
    Hybrid,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Chain => "chain",
            Self::Convergence => "convergence",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result being distilled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// The pipeline validated on every training pair.
    Success,
    /// The pipeline did not validate but reached this cell accuracy.
    NearMiss { accuracy: f64 },
    /// The pipeline was tried and did not validate.
    Failure,
}

/// How much an entry's pipeline is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Confidence {
    Verified,
    NearMiss { accuracy: f64 },
}

/// A distilled pipeline keyed by its task fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub fingerprint: Fingerprint,
    pub pipeline: Pipeline,
    pub method: Method,
    pub confidence: Confidence,
    pub hits: u64,
    pub successes: u64,
    pub failures: u64,
    pub score: f64,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

/// Hit count at which the hit term saturates.
const HIT_SATURATION: f64 = 64.0;
/// Recency half-scale, in days.
const RECENCY_DAYS: f64 = 30.0;

impl MemoryEntry {
    /// Blend of log-scaled hits (0.3), Laplace-smoothed success rate (0.5)
    /// and exponential recency (0.2). Near misses are scaled by
    /// `accuracy * 0.5`, so they rank below verified entries.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score_at(&self, now: DateTime<Utc>) -> f64 {
        let hits = ((1.0 + self.hits as f64).ln() / (1.0 + HIT_SATURATION).ln()).min(1.0);
        let rate = (self.successes as f64 + 1.0) / ((self.successes + self.failures) as f64 + 2.0);
        let days = ((now - self.last_used).num_seconds() as f64 / 86_400.0).max(0.0);
        let recency = (-days / RECENCY_DAYS).exp();
        let base = 0.3 * hits + 0.5 * rate + 0.2 * recency;
        match self.confidence {
            Confidence::Verified => base,
            Confidence::NearMiss { accuracy } => base * accuracy.clamp(0.0, 1.0) * 0.5,
        }
    }

    pub(crate) fn rescore(&mut self, now: DateTime<Utc>) {
        self.score = self.score_at(now);
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self.confidence, Confidence::Verified)
    }
}
