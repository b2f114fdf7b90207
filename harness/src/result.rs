//! Solve results and solver statistics.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_kernel::{Grid, Pipeline};
use tessera_memory::Method;
use tessera_search::SearchEvent;

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// A pipeline validated on every training pair.
    Ok,
    /// Every phase ran to completion without a solution.
    Fail,
    Timeout,
    Limit,
    /// The solver's cancellation token fired.
    Cancelled,
}

impl SolveStatus {
    /// Status for a non-winning hybrid terminal event.
    #[must_use]
    pub fn from_terminal(event: &SearchEvent) -> Self {
        match event {
            SearchEvent::Win { .. } => Self::Ok,
            SearchEvent::Timeout { .. } => Self::Timeout,
            SearchEvent::Limit { .. } => Self::Limit,
            SearchEvent::Cancelled { .. } => Self::Cancelled,
            _ => Self::Fail,
        }
    }
}

/// Observable solver counters. Per solve in a [`SolveResult`]; accumulated
/// across solves on the solver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Candidate pipelines tried across all phases.
    pub strategies_tried: u64,
    /// Longest pipeline any phase evaluated.
    pub deepest_pipeline: usize,
    pub phase_invocations: BTreeMap<Method, u64>,
    pub phase_hits: BTreeMap<Method, u64>,
    /// Branch factor used by each adaptive phase, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branch_factor_history: Vec<usize>,
}

impl SolveStats {
    pub fn invoked(&mut self, phase: Method) {
        *self.phase_invocations.entry(phase).or_default() += 1;
    }

    pub fn hit(&mut self, phase: Method) {
        *self.phase_hits.entry(phase).or_default() += 1;
    }

    pub fn tried(&mut self, strategies: u64, deepest: usize) {
        self.strategies_tried += strategies;
        self.deepest_pipeline = self.deepest_pipeline.max(deepest);
    }

    #[must_use]
    pub fn invocations(&self, phase: Method) -> u64 {
        self.phase_invocations.get(&phase).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn hits(&self, phase: Method) -> u64 {
        self.phase_hits.get(&phase).copied().unwrap_or(0)
    }

    /// Add `other` into `self`.
    pub fn absorb(&mut self, other: &Self) {
        self.tried(other.strategies_tried, other.deepest_pipeline);
        for (phase, n) in &other.phase_invocations {
            *self.phase_invocations.entry(*phase).or_default() += n;
        }
        for (phase, n) in &other.phase_hits {
            *self.phase_hits.entry(*phase).or_default() += n;
        }
        self.branch_factor_history.extend_from_slice(&other.branch_factor_history);
    }
}

/// Everything a caller learns from one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    pub task_id: String,
    pub status: SolveStatus,
    /// Phase that produced the pipeline, when `status` is `Ok`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    /// Canonical solving pipeline, when `status` is `Ok`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Pipeline>,
    /// One entry per test input; `null` where the pipeline does not apply.
    pub outputs: Vec<Option<Grid>>,
    /// One entry per test input; `null` where no expected output was given.
    pub correct: Vec<Option<bool>>,
    #[serde(rename = "elapsed_ms", with = "tessera_search::budget::millis")]
    pub elapsed: Duration,
    /// Candidate pipelines tried across all phases.
    pub steps: u64,
    pub stats: SolveStats,
}

impl SolveResult {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == SolveStatus::Ok
    }

    /// Every test with an expected output was answered correctly, and at
    /// least one such test exists.
    #[must_use]
    pub fn all_correct(&self) -> bool {
        let known: Vec<bool> = self.correct.iter().filter_map(|c| *c).collect();
        !known.is_empty() && known.iter().all(|&c| c)
    }
}
