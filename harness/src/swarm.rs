//! Adaptive branch swarm.
//!
//! Each phase fans out `branch_factor` independent attempts on the rayon
//! pool, each with parameters derived from its branch index. Branch
//! feedback (best cell accuracy seen) is averaged per phase and moves the
//! branch factor for the next phase: low feedback widens the swarm, high
//! feedback narrows it. When several branches win, the lowest index is
//! taken, so results do not depend on thread scheduling.
//!
//! The phases are memory, chain and hybrid. There is no convergence phase;
//! the convergence collaborator is only used to stabilize hybrid wins when
//! `stabilize` is set. [`crate::EscalationSolver`] runs the full phase.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tessera_kernel::digest::hash::ContentHash;
use tessera_kernel::oracle::score;
use tessera_kernel::{Pipeline, Task, TrainingPair};
use tessera_memory::{fingerprint, MemoryStore, Method, Recalled};
use tessera_search::{
    rank_chains, search, CancelToken, CheckpointSink, Convergence, HybridBudgetV1, NullSink, RankedChain, SearchError,
    SearchEvent,
};

use crate::config::{SolverConfig, SwarmConfig};
use crate::error::SolveError;
use crate::result::{SolveResult, SolveStats, SolveStatus};
use crate::shared::SolverCore;

/// Next branch factor after a phase that averaged `feedback`.
///
/// Always within `[1, config.max_branch_factor]`.
#[must_use]
pub fn adapt(factor: usize, feedback: f64, config: &SwarmConfig) -> usize {
    let next = if feedback < config.explore_below {
        factor + 1
    } else if feedback > config.narrow_above {
        factor.saturating_sub(1)
    } else {
        factor
    };
    next.clamp(1, config.max_branch_factor.max(1))
}

/// What one branch of one phase found.
#[derive(Debug, Default)]
struct Branch {
    winner: Option<Pipeline>,
    feedback: f64,
    tried: u64,
    deepest: usize,
    near_miss: Option<RankedChain>,
    terminal: Option<SearchEvent>,
    /// Recalled entries that no longer validate.
    stale: Vec<ContentHash>,
}

/// Mean branch feedback. `None` when no branch evaluated anything.
fn phase_feedback(branches: &[Branch]) -> Option<f64> {
    if branches.iter().all(|b| b.tried == 0) {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = branches.len() as f64;
    Some(branches.iter().map(|b| b.feedback).sum::<f64>() / n)
}

/// Hybrid budget for branch `index` of `factor`.
fn branch_budget(base: HybridBudgetV1, index: usize, factor: usize) -> HybridBudgetV1 {
    let divisor = u32::try_from(factor.max(1)).unwrap_or(u32::MAX);
    HybridBudgetV1 {
        beam_width: base.beam_width.saturating_mul(index + 1),
        time_limit: (base.time_limit / divisor).max(Duration::from_nanos(1)),
        ..base
    }
}

/// Solver that runs each phase as a parallel swarm of branches.
pub struct AdaptiveSwarmSolver {
    core: SolverCore,
    branch_factor: usize,
}

impl AdaptiveSwarmSolver {
    /// # Errors
    ///
    /// [`SolveError::Config`] if the configuration is invalid or names an
    /// unknown primitive.
    pub fn new(config: SolverConfig) -> Result<Self, SolveError> {
        let branch_factor = config.swarm.initial_branch_factor;
        Ok(Self {
            core: SolverCore::new(config)?,
            branch_factor,
        })
    }

    #[must_use]
    pub fn with_convergence(mut self, convergence: Box<dyn Convergence>) -> Self {
        self.core.convergence = convergence;
        self
    }

    /// Sink for branch 0's hybrid checkpoints.
    #[must_use]
    pub fn with_checkpoints(mut self, sink: Box<dyn CheckpointSink>) -> Self {
        self.core.checkpoints = sink;
        self
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.core.cancel.clone()
    }

    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.core.config
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryStore {
        &self.core.memory
    }

    #[must_use]
    pub fn stats(&self) -> &SolveStats {
        &self.core.stats
    }

    /// Branch factor the next phase will use.
    #[must_use]
    pub fn branch_factor(&self) -> usize {
        self.branch_factor
    }

    pub fn save_memory(&mut self) -> bool {
        self.core.memory.save()
    }

    /// Solve one task with adaptive parallel phases.
    ///
    /// # Errors
    ///
    /// As [`crate::EscalationSolver::solve`].
    pub fn solve(&mut self, task: &Task) -> Result<SolveResult, SolveError> {
        let start = Instant::now();
        let pairs = &task.train;
        let fp = fingerprint(pairs);
        let mut stats = SolveStats::default();
        tracing::debug!(task = %task.id, branch_factor = self.branch_factor, "swarm solve");

        // Memory
        stats.invoked(Method::Memory);
        let recalled = self.core.memory.recall(&fp);
        let branches = self.memory_phase(pairs, &recalled);
        let (winner, feedback) = self.settle(&branches, &mut stats);
        for branch in &branches {
            for hash in &branch.stale {
                self.core.memory.record_failure_by_hash(hash);
            }
        }
        if let Some(pipeline) = winner {
            return self.core.succeed(task, &fp, pipeline, Method::Memory, stats, start);
        }
        self.adapt_after(feedback);
        if self.core.cancelled() {
            return Ok(self.core.give_up(task, &fp, SolveStatus::Cancelled, None, stats, start));
        }

        // Chain
        stats.invoked(Method::Chain);
        let branches = self.chain_phase(pairs)?;
        let (winner, feedback) = self.settle(&branches, &mut stats);
        if let Some(pipeline) = winner {
            return self.core.succeed(task, &fp, pipeline, Method::Chain, stats, start);
        }
        let near_miss = best_near_miss(&branches);
        self.adapt_after(feedback);
        if self.core.cancelled() {
            return Ok(self.core.give_up(task, &fp, SolveStatus::Cancelled, near_miss.as_ref(), stats, start));
        }

        // Hybrid
        stats.invoked(Method::Hybrid);
        let seeds: Vec<Pipeline> = recalled.into_iter().map(|r| r.pipeline).collect();
        let branches = self.hybrid_phase(pairs, &seeds)?;
        let (winner, feedback) = self.settle(&branches, &mut stats);
        if let Some(pipeline) = winner {
            return self.core.succeed(task, &fp, pipeline, Method::Hybrid, stats, start);
        }
        self.adapt_after(feedback);
        let status = branches
            .iter()
            .filter_map(|b| b.terminal.as_ref())
            .find(|t| !matches!(t, SearchEvent::None { .. }))
            .map_or(SolveStatus::Fail, SolveStatus::from_terminal);
        Ok(self.core.give_up(task, &fp, status, near_miss.as_ref(), stats, start))
    }

    /// Fold branch counters into `stats`; return the lowest-index winner
    /// and the phase feedback.
    fn settle(&self, branches: &[Branch], stats: &mut SolveStats) -> (Option<Pipeline>, Option<f64>) {
        stats.branch_factor_history.push(self.branch_factor);
        for branch in branches {
            stats.tried(branch.tried, branch.deepest);
        }
        let winner = branches.iter().find_map(|b| b.winner.clone());
        (winner, phase_feedback(branches))
    }

    fn adapt_after(&mut self, feedback: Option<f64>) {
        let Some(feedback) = feedback else {
            return;
        };
        let next = adapt(self.branch_factor, feedback, &self.core.config.swarm);
        if next != self.branch_factor {
            tracing::debug!(from = self.branch_factor, to = next, feedback, "branch factor adapted");
        }
        self.branch_factor = next;
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    /// Branch `i` scores the recalled entries at positions `j` with
    /// `j % factor == i`.
    fn memory_phase(&self, pairs: &[TrainingPair], recalled: &[Recalled]) -> Vec<Branch> {
        let factor = self.branch_factor;
        let registry = &self.core.registry;
        (0..factor)
            .into_par_iter()
            .map(|i| {
                let mut branch = Branch::default();
                for hit in recalled.iter().skip(i).step_by(factor) {
                    branch.tried += 1;
                    branch.deepest = branch.deepest.max(hit.pipeline.depth());
                    match score(&hit.pipeline, pairs, registry) {
                        Ok(s) if s.is_perfect() => {
                            branch.feedback = 1.0;
                            branch.winner = Some(hit.pipeline.clone());
                            break;
                        }
                        Ok(s) => {
                            branch.feedback = branch.feedback.max(s.cell_accuracy);
                            branch.stale.push(hit.fingerprint_hash.clone());
                        }
                        Err(error) => {
                            tracing::warn!(pipeline = %hit.pipeline, %error, "stored pipeline rejected by registry");
                            branch.stale.push(hit.fingerprint_hash.clone());
                        }
                    }
                }
                branch
            })
            .collect()
    }

    /// Branch `i` searches to depth `base + i % 2` over
    /// `sample_limit × (i + 1)` candidates.
    fn chain_phase(&self, pairs: &[TrainingPair]) -> Result<Vec<Branch>, SolveError> {
        let core = &self.core;
        let base = core.config.chain;
        let sample_limit = core.config.chain_sample_limit;
        let branches = (0..self.branch_factor)
            .into_par_iter()
            .map(|i| -> Result<Branch, SearchError> {
                let mut budget = base;
                budget.max_depth = base.max_depth + i % 2;
                let ranking = rank_chains(&core.chain_search(budget), pairs, sample_limit.saturating_mul(i + 1), 1)?;
                let top = ranking.ranked.into_iter().next();
                Ok(Branch {
                    winner: top.as_ref().filter(|t| t.score.is_perfect()).map(|t| t.pipeline.clone()),
                    feedback: top.as_ref().map_or(0.0, |t| t.score.cell_accuracy),
                    tried: ranking.candidates,
                    deepest: ranking.deepest,
                    near_miss: top,
                    ..Branch::default()
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(branches)
    }

    /// Branch `i` widens the beam to `beam_width × (i + 1)` and gets an
    /// equal share of the time budget. Only branch 0 writes checkpoints.
    fn hybrid_phase(&self, pairs: &[TrainingPair], seeds: &[Pipeline]) -> Result<Vec<Branch>, SolveError> {
        let core = &self.core;
        let factor = self.branch_factor;
        let base = core.config.hybrid;
        let branches = (0..factor)
            .into_par_iter()
            .map(|i| -> Result<Branch, SearchError> {
                let ctx = if i == 0 {
                    core.search_context()
                } else {
                    core.search_context().with_checkpoints(&NullSink)
                };
                let outcome = search(ctx, pairs, branch_budget(base, i, factor), seeds.to_vec())?;
                Ok(Branch {
                    winner: outcome.pipeline().cloned(),
                    feedback: outcome.best_accuracy,
                    tried: outcome.candidates,
                    deepest: outcome.deepest,
                    terminal: Some(outcome.terminal),
                    ..Branch::default()
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(branches)
    }
}

/// Highest-accuracy chain candidate across branches, lowest index on ties.
fn best_near_miss(branches: &[Branch]) -> Option<RankedChain> {
    branches
        .iter()
        .filter_map(|b| b.near_miss.as_ref())
        .fold(None::<&RankedChain>, |best, c| match best {
            Some(b) if b.score.cell_accuracy >= c.score.cell_accuracy => Some(b),
            _ => Some(c),
        })
        .cloned()
}
