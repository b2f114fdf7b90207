//! State and steps shared by both solvers.

use std::time::Instant;

use tessera_kernel::oracle::validate;
use tessera_kernel::pipeline::canonicalize::canonicalize;
use tessera_kernel::{Pipeline, PrimitiveRegistryV1, Task, TrainingPair};
use tessera_memory::{Fingerprint, MemoryStore, Method, Outcome};
use tessera_search::{
    converge_guarded, CancelToken, ChainBudgetV1, ChainSearch, CheckpointSink, Convergence, FileSink,
    FixedPointConvergence, NullSink, RankedChain, RegistryGenerator, SearchContext,
};

use crate::config::{ConfigError, SolverConfig};
use crate::error::SolveError;
use crate::result::{SolveResult, SolveStats, SolveStatus};

pub(crate) struct SolverCore {
    pub config: SolverConfig,
    pub registry: PrimitiveRegistryV1,
    pub generator: RegistryGenerator,
    pub memory: MemoryStore,
    pub convergence: Box<dyn Convergence>,
    pub checkpoints: Box<dyn CheckpointSink>,
    pub cancel: CancelToken,
    pub stats: SolveStats,
}

impl SolverCore {
    pub fn new(config: SolverConfig) -> Result<Self, SolveError> {
        config.validate()?;
        let registry = config.registry()?;
        let memory = MemoryStore::open(config.memory.clone(), &registry)
            .map_err(|e| ConfigError::Invalid { detail: e.to_string() })?;
        let checkpoints: Box<dyn CheckpointSink> = match &config.checkpoint_path {
            Some(path) => Box::new(FileSink::new(path.clone())),
            None => Box::new(NullSink),
        };
        Ok(Self {
            generator: RegistryGenerator::new(registry.clone()),
            registry,
            memory,
            convergence: Box::new(FixedPointConvergence),
            checkpoints,
            cancel: CancelToken::new(),
            stats: SolveStats::default(),
            config,
        })
    }

    pub fn chain_search(&self, budget: ChainBudgetV1) -> ChainSearch<'_> {
        ChainSearch {
            registry: &self.registry,
            generator: &self.generator,
            budget,
            cancel: Some(&self.cancel),
        }
    }

    pub fn search_context(&self) -> SearchContext<'_> {
        let ctx = SearchContext::new(&self.registry, &self.generator)
            .with_heuristics(self.memory.heuristics())
            .with_checkpoints(self.checkpoints.as_ref())
            .with_cancel(&self.cancel);
        if self.config.stabilize {
            ctx.with_stabilization(self.convergence.as_ref(), self.config.convergence_iterations)
        } else {
            ctx
        }
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Re-validate a recalled or rewritten pipeline. A pipeline the current
    /// registry rejects counts as not validating.
    pub fn revalidate(&self, pipeline: &Pipeline, pairs: &[TrainingPair]) -> bool {
        validate(pipeline, pairs, &self.registry).unwrap_or_else(|error| {
            tracing::warn!(%pipeline, %error, "stored pipeline rejected by registry");
            false
        })
    }

    /// Hand each near miss to the convergence collaborator. A chain that
    /// drives every training input to its output within `k` iterations is
    /// repeated `k` times and re-validated.
    pub fn converge(
        &self,
        pairs: &[TrainingPair],
        ranked: &[RankedChain],
        stats: &mut SolveStats,
    ) -> Result<Option<Pipeline>, SolveError> {
        for chain in ranked {
            stats.tried(1, chain.pipeline.depth());
            let mut rounds = 0;
            let converged = !pairs.is_empty()
                && pairs.iter().all(|pair| {
                    match converge_guarded(
                        self.convergence.as_ref(),
                        &pair.input,
                        &chain.pipeline,
                        self.config.convergence_iterations,
                        &self.registry,
                    ) {
                        Some(c) if c.grid == pair.output => {
                            rounds = rounds.max(c.iterations);
                            true
                        }
                        _ => false,
                    }
                });
            if !converged {
                continue;
            }
            let candidate = chain.pipeline.repeat(rounds.max(1));
            if validate(&candidate, pairs, &self.registry)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Canonicalize, distill and answer the test inputs.
    pub fn succeed(
        &mut self,
        task: &Task,
        fingerprint: &Fingerprint,
        pipeline: Pipeline,
        method: Method,
        mut stats: SolveStats,
        start: Instant,
    ) -> Result<SolveResult, SolveError> {
        let canonical = canonicalize(&pipeline, &self.registry);
        let pipeline = if canonical == pipeline || self.revalidate(&canonical, &task.train) {
            canonical
        } else {
            tracing::warn!(%pipeline, %canonical, "canonical form does not validate; keeping original");
            pipeline
        };
        stats.hit(method);
        self.memory.distill(fingerprint, &pipeline, method, Outcome::Success);

        let outputs = task
            .test
            .iter()
            .map(|t| pipeline.apply(&t.input, &self.registry))
            .collect::<Result<Vec<_>, _>>()?;
        let correct = task
            .test
            .iter()
            .zip(&outputs)
            .map(|(t, out)| t.output.as_ref().map(|expected| out.as_ref() == Some(expected)))
            .collect();

        tracing::info!(task = %task.id, %method, %pipeline, steps = stats.strategies_tried, "solved");
        self.stats.absorb(&stats);
        Ok(SolveResult {
            task_id: task.id.clone(),
            status: SolveStatus::Ok,
            method: Some(method),
            pipeline: Some(pipeline),
            outputs,
            correct,
            elapsed: start.elapsed(),
            steps: stats.strategies_tried,
            stats,
        })
    }

    /// Record the best near miss, if good enough, and report `status`.
    pub fn give_up(
        &mut self,
        task: &Task,
        fingerprint: &Fingerprint,
        status: SolveStatus,
        near_miss: Option<&RankedChain>,
        stats: SolveStats,
        start: Instant,
    ) -> SolveResult {
        if let Some(near) = near_miss {
            let accuracy = near.score.cell_accuracy;
            if accuracy >= self.config.near_miss_threshold && !near.score.is_perfect() {
                tracing::debug!(task = %task.id, pipeline = %near.pipeline, accuracy, "recording near miss");
                self.memory
                    .distill(fingerprint, &near.pipeline, Method::Chain, Outcome::NearMiss { accuracy });
            }
        }
        tracing::info!(task = %task.id, ?status, steps = stats.strategies_tried, "unsolved");
        self.stats.absorb(&stats);
        SolveResult {
            task_id: task.id.clone(),
            status,
            method: None,
            pipeline: None,
            outputs: vec![None; task.test.len()],
            correct: task.test.iter().map(|t| t.output.as_ref().map(|_| false)).collect(),
            elapsed: start.elapsed(),
            steps: stats.strategies_tried,
            stats,
        }
    }
}
