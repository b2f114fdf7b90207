//! Sequential escalation: memory, chain, convergence, hybrid.
//!
//! Each phase runs only if every earlier phase failed to validate a
//! pipeline. The first validated pipeline is canonicalized, distilled into
//! memory and applied to the test inputs.

use std::time::Instant;

use tessera_kernel::Task;
use tessera_memory::{fingerprint, MemoryStore, Method};
use tessera_search::{find_valid_chain, rank_chains, search, CancelToken, ChainStop, CheckpointSink, Convergence};

use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::result::{SolveResult, SolveStats, SolveStatus};
use crate::shared::SolverCore;

/// Solver that escalates through the phases one at a time.
pub struct EscalationSolver {
    core: SolverCore,
}

impl EscalationSolver {
    /// Build a solver, opening its memory store.
    ///
    /// # Errors
    ///
    /// [`SolveError::Config`] if the configuration is invalid or names an
    /// unknown primitive.
    pub fn new(config: SolverConfig) -> Result<Self, SolveError> {
        Ok(Self {
            core: SolverCore::new(config)?,
        })
    }

    /// Replace the convergence collaborator.
    #[must_use]
    pub fn with_convergence(mut self, convergence: Box<dyn Convergence>) -> Self {
        self.core.convergence = convergence;
        self
    }

    /// Replace the hybrid checkpoint sink.
    #[must_use]
    pub fn with_checkpoints(mut self, sink: Box<dyn CheckpointSink>) -> Self {
        self.core.checkpoints = sink;
        self
    }

    /// A handle that aborts the current and every later solve when cancelled.
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

    /// Counters accumulated over every solve so far.
    #[must_use]
    pub fn stats(&self) -> &SolveStats {
        &self.core.stats
    }

    /// Persist memory. `false` when persistence was skipped or failed.
    pub fn save_memory(&mut self) -> bool {
        self.core.memory.save()
    }

    /// Solve one task.
    ///
    /// Resource exhaustion is a result, not an error: `timeout`, `limit`
    /// and `cancelled` come back as a [`SolveResult`] status.
    ///
    /// # Errors
    ///
    /// [`SolveError::Search`] for an invalid budget or a generator that
    /// breaks the registry contract.
    pub fn solve(&mut self, task: &Task) -> Result<SolveResult, SolveError> {
        let start = Instant::now();
        let pairs = &task.train;
        let fp = fingerprint(pairs);
        let mut stats = SolveStats::default();
        tracing::debug!(task = %task.id, pairs = pairs.len(), fingerprint = %fp.hash.short(12), "solve");

        // Memory
        stats.invoked(Method::Memory);
        let recalled = self.core.memory.recall(&fp);
        for hit in &recalled {
            stats.tried(1, hit.pipeline.depth());
            if self.core.revalidate(&hit.pipeline, pairs) {
                return self.core.succeed(task, &fp, hit.pipeline.clone(), Method::Memory, stats, start);
            }
            self.core.memory.record_failure_by_hash(&hit.fingerprint_hash);
        }
        if self.core.cancelled() {
            return Ok(self.core.give_up(task, &fp, SolveStatus::Cancelled, None, stats, start));
        }

        // Chain
        stats.invoked(Method::Chain);
        let report = find_valid_chain(&self.core.chain_search(self.core.config.chain), pairs)?;
        stats.tried(report.candidates, report.deepest);
        tracing::debug!(task = %task.id, candidates = report.candidates, stop = ?report.stop, "chain phase");
        if let Some(pipeline) = report.found {
            return self.core.succeed(task, &fp, pipeline, Method::Chain, stats, start);
        }
        if matches!(report.stop, Some(ChainStop::Cancelled)) {
            return Ok(self.core.give_up(task, &fp, SolveStatus::Cancelled, None, stats, start));
        }

        // Convergence
        stats.invoked(Method::Convergence);
        let ranking = rank_chains(
            &self.core.chain_search(self.core.config.chain),
            pairs,
            self.core.config.chain_sample_limit,
            self.core.config.convergence_candidates.max(1),
        )?;
        stats.tried(ranking.candidates, ranking.deepest);
        let best = ranking.ranked.first().cloned();
        if let Some(top) = best.as_ref().filter(|top| top.score.is_perfect()) {
            return self.core.succeed(task, &fp, top.pipeline.clone(), Method::Chain, stats, start);
        }
        if let Some(pipeline) = self.core.converge(pairs, &ranking.ranked, &mut stats)? {
            return self.core.succeed(task, &fp, pipeline, Method::Convergence, stats, start);
        }
        if self.core.cancelled() {
            return Ok(self.core.give_up(task, &fp, SolveStatus::Cancelled, best.as_ref(), stats, start));
        }

        // Hybrid
        stats.invoked(Method::Hybrid);
        let seeds = recalled.into_iter().map(|r| r.pipeline).collect();
        let outcome = search(self.core.search_context(), pairs, self.core.config.hybrid, seeds)?;
        stats.tried(outcome.candidates, outcome.deepest);
        tracing::debug!(task = %task.id, terminal = outcome.terminal.kind(), steps = outcome.steps, "hybrid phase");
        if let Some(pipeline) = outcome.pipeline() {
            return self.core.succeed(task, &fp, pipeline.clone(), Method::Hybrid, stats, start);
        }
        let status = SolveStatus::from_terminal(&outcome.terminal);
        Ok(self.core.give_up(task, &fp, status, best.as_ref(), stats, start))
    }
}
