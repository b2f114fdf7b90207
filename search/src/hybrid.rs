//! Beam + depth-first hybrid search.
//!
//! [`HybridSearch`] is an iterator of [`SearchEvent`]s that ends after
//! exactly one terminal event. Work is done lazily, one candidate step per
//! advance, so step, clock and cancellation checks interleave with
//! expansion.
//!
//! Phases, in order:
//! 1. **Recall**: each seed pipeline is tried once; a validating seed wins.
//!    Non-validating seeds join the root in the first beam level.
//! 2. **Beam**: every state in the level is expanded by one step; children
//!    are checked against all pairs immediately and admitted to the next
//!    level, which is pruned to `beam_width`. Runs `max_depth` levels.
//! 3. **Depth**: depth-first from the final frontier, best state first, up
//!    to pipelines of `2 * max_depth` steps.
//!
//! Visited states (hash over all current grids) are suppressed across all
//! three phases. A contract violation from the generator ends the stream
//! without a terminal event; [`HybridSearch::take_error`] reports it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tessera_kernel::{Grid, Pipeline, PrimitiveRegistryV1, Step, TrainingPair};
use tessera_memory::Heuristics;

use crate::budget::HybridBudgetV1;
use crate::cancel::CancelToken;
use crate::candidates::{output_colors, palette, CandidateGenerator};
use crate::checkpoint::{CheckpointSink, CheckpointV1, NullSink};
use crate::convergence::{converge_guarded, Convergence};
use crate::error::SearchError;
use crate::event::{SearchEvent, SearchPhase};
use crate::frontier::BeamFrontier;
use crate::state::SearchState;

/// Scale applied to the heuristics bonus before it joins the beam rank.
pub const HEURISTIC_WEIGHT: f64 = 0.01;

/// Iterations offered to the convergence collaborator when stabilizing.
pub const DEFAULT_STABILIZE_ITERATIONS: usize = 8;

/// Collaborators shared by every phase of a search.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub registry: &'a PrimitiveRegistryV1,
    pub generator: &'a dyn CandidateGenerator,
    /// Primitive win ratios that nudge the beam ranking.
    pub heuristics: Option<&'a Heuristics>,
    /// When set, wins are stabilized through this collaborator.
    pub convergence: Option<&'a dyn Convergence>,
    pub stabilize_iterations: usize,
    pub checkpoints: &'a dyn CheckpointSink,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> SearchContext<'a> {
    #[must_use]
    pub fn new(registry: &'a PrimitiveRegistryV1, generator: &'a dyn CandidateGenerator) -> Self {
        Self {
            registry,
            generator,
            heuristics: None,
            convergence: None,
            stabilize_iterations: DEFAULT_STABILIZE_ITERATIONS,
            checkpoints: &NullSink,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_heuristics(mut self, heuristics: &'a Heuristics) -> Self {
        self.heuristics = Some(heuristics);
        self
    }

    #[must_use]
    pub fn with_stabilization(mut self, convergence: &'a dyn Convergence, iterations: usize) -> Self {
        self.convergence = Some(convergence);
        self.stabilize_iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_checkpoints(mut self, sink: &'a dyn CheckpointSink) -> Self {
        self.checkpoints = sink;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

enum Stage {
    Recall { next: usize },
    Beam,
    Depth,
}

/// A state with its not-yet-tried steps. Steps are generated on first use.
struct Expansion {
    state: SearchState,
    steps: Option<VecDeque<Step>>,
}

/// The hybrid search engine as a lazy event stream.
pub struct HybridSearch<'a> {
    ctx: SearchContext<'a>,
    pairs: &'a [TrainingPair],
    budget: HybridBudgetV1,
    seeds: Vec<Pipeline>,
    outputs: Vec<u8>,
    start: Instant,
    stage: Stage,
    frontier: BeamFrontier,
    level: VecDeque<SearchState>,
    level_depth: usize,
    expanding: Option<Expansion>,
    stack: Vec<Expansion>,
    steps: u64,
    created: u64,
    deepest: usize,
    best_accuracy: i64,
    pending: VecDeque<SearchEvent>,
    finished: bool,
    error: Option<SearchError>,
}

impl<'a> HybridSearch<'a> {
    /// Prepare a search. No step runs until the iterator is polled.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidBudget`] if any budget field is zero.
    pub fn new(
        ctx: SearchContext<'a>,
        pairs: &'a [TrainingPair],
        budget: HybridBudgetV1,
        seeds: Vec<Pipeline>,
    ) -> Result<Self, SearchError> {
        budget.validate()?;
        let inputs: Vec<Grid> = pairs.iter().map(|p| p.input.clone()).collect();
        let root = SearchState::new(inputs, Pipeline::empty(), pairs, 0.0, 0);
        let mut frontier = BeamFrontier::new();
        frontier.mark_visited(&root.hash);
        let mut search = Self {
            ctx,
            pairs,
            budget,
            seeds,
            outputs: output_colors(pairs),
            start: Instant::now(),
            stage: Stage::Recall { next: 0 },
            frontier,
            level: VecDeque::new(),
            level_depth: 0,
            expanding: None,
            stack: Vec::new(),
            steps: 0,
            created: 0,
            deepest: 0,
            best_accuracy: accuracy_micros(&root),
            pending: VecDeque::new(),
            finished: false,
            error: None,
        };
        let solved = root.solves(pairs);
        search.level.push_back(root);
        if pairs.is_empty() {
            search.terminate(SearchEvent::None { steps: 0 });
        } else if solved {
            // Every output equals its input: the root is never expanded as
            // a candidate, so the empty pipeline wins before any step.
            search.win(Pipeline::empty(), SearchPhase::Beam);
        }
        Ok(search)
    }

    /// Candidate pipelines tried so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Longest pipeline evaluated so far.
    #[must_use]
    pub fn deepest(&self) -> usize {
        self.deepest
    }

    /// States created so far.
    #[must_use]
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Best cell accuracy of any state seen, root included.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn best_accuracy(&self) -> f64 {
        self.best_accuracy as f64 / 1_000_000.0
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The contract violation that ended the stream, if any.
    pub fn take_error(&mut self) -> Option<SearchError> {
        self.error.take()
    }

    // -----------------------------------------------------------------------
    // Stream control
    // -----------------------------------------------------------------------

    fn terminate(&mut self, event: SearchEvent) {
        tracing::debug!(event = event.kind(), steps = self.steps, "hybrid search finished");
        self.pending.push_back(event);
        self.finished = true;
    }

    fn fail(&mut self, error: SearchError) {
        tracing::warn!(%error, steps = self.steps, "hybrid search aborted on contract violation");
        self.error = Some(error);
        self.finished = true;
    }

    fn frontier_size(&self) -> usize {
        match self.stage {
            Stage::Depth => self.stack.len(),
            _ => self.frontier.len() + self.level.len(),
        }
    }

    /// Wall clock and cancellation. Emits the terminal event on failure.
    fn clock_ok(&mut self) -> bool {
        if self.ctx.cancel.is_some_and(CancelToken::is_cancelled) {
            self.terminate(SearchEvent::Cancelled { steps: self.steps });
            return false;
        }
        if self.start.elapsed() >= self.budget.time_limit {
            self.terminate(SearchEvent::Timeout { steps: self.steps });
            return false;
        }
        true
    }

    /// Gate for one candidate step: the step ceiling every time, the clock
    /// every `check_interval` steps, a checkpoint every
    /// `checkpoint_interval` steps.
    fn admit_step(&mut self, phase: SearchPhase) -> bool {
        if self.steps >= self.budget.max_steps {
            self.terminate(SearchEvent::Limit { steps: self.steps });
            return false;
        }
        if self.steps > 0 && self.steps.is_multiple_of(self.budget.check_interval) {
            self.pending.push_back(SearchEvent::Progress {
                phase,
                depth: self.deepest,
                steps: self.steps,
                frontier: self.frontier_size(),
                elapsed: self.start.elapsed(),
            });
            if !self.clock_ok() {
                return false;
            }
        }
        self.steps += 1;
        if self.steps.is_multiple_of(self.budget.checkpoint_interval) {
            self.checkpoint(phase);
        }
        true
    }

    fn checkpoint(&self, phase: SearchPhase) {
        let checkpoint = CheckpointV1::new(
            phase,
            self.deepest,
            self.steps,
            self.start.elapsed(),
            self.frontier_size(),
        );
        if let Err(error) = self.ctx.checkpoints.write(&checkpoint) {
            tracing::warn!(%error, steps = self.steps, "checkpoint write failed; continuing");
        }
    }

    fn win(&mut self, pipeline: Pipeline, phase: SearchPhase) {
        let stabilized = self.ctx.convergence.map(|convergence| {
            self.pairs.iter().all(|pair| {
                converge_guarded(
                    convergence,
                    &pair.input,
                    &pipeline,
                    self.ctx.stabilize_iterations,
                    self.ctx.registry,
                )
                .is_some_and(|c| c.grid == pair.output)
            })
        });
        tracing::info!(%pipeline, %phase, steps = self.steps, ?stabilized, "hybrid search win");
        self.terminate(SearchEvent::Win {
            pipeline,
            phase,
            steps: self.steps,
            stabilized,
        });
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    fn steps_for(&self, state: &SearchState) -> VecDeque<Step> {
        let colors = palette(&state.grids, &self.outputs);
        self.ctx.generator.candidates(&state.grids, &colors).into()
    }

    /// Build and check the state `grids` reached by `pipeline`.
    ///
    /// Returns the state when it is new and not a win.
    fn consider(&mut self, grids: Vec<Grid>, pipeline: Pipeline, phase: SearchPhase) -> Option<SearchState> {
        let bonus = self
            .ctx
            .heuristics
            .map_or(0.0, |h| h.pipeline_bonus(&pipeline) * HEURISTIC_WEIGHT);
        let state = SearchState::new(grids, pipeline, self.pairs, bonus, self.created + 1);
        if self.frontier.is_visited(&state.hash) {
            return None;
        }
        self.created += 1;
        self.deepest = self.deepest.max(state.depth());
        if state.solves(self.pairs) {
            self.win(state.pipeline, phase);
            return None;
        }
        let accuracy = accuracy_micros(&state);
        if accuracy > self.best_accuracy {
            self.best_accuracy = accuracy;
            self.pending.push_back(SearchEvent::Candidate {
                pipeline: state.pipeline.clone(),
                cell_accuracy: state.score.cell_accuracy,
                steps: self.steps,
            });
        }
        Some(state)
    }

    /// Apply one step to every grid of `parent`.
    fn try_step(&mut self, parent: &SearchState, step: Step, phase: SearchPhase) -> Option<SearchState> {
        let mut grids = Vec::with_capacity(parent.grids.len());
        for g in &parent.grids {
            match step.apply(g, self.ctx.registry) {
                Ok(Some(out)) => grids.push(out),
                Ok(None) => return None,
                Err(e) => {
                    self.fail(e.into());
                    return None;
                }
            }
        }
        self.consider(grids, parent.pipeline.then(step), phase)
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    fn advance(&mut self) {
        match self.stage {
            Stage::Recall { next } => self.advance_recall(next),
            Stage::Beam => self.advance_beam(),
            Stage::Depth => self.advance_depth(),
        }
    }

    fn advance_recall(&mut self, next: usize) {
        let Some(seed) = self.seeds.get(next).cloned() else {
            tracing::debug!(seeds = self.seeds.len(), "recall phase done");
            self.stage = Stage::Beam;
            self.clock_ok();
            return;
        };
        self.stage = Stage::Recall { next: next + 1 };
        if !self.admit_step(SearchPhase::Recall) {
            return;
        }
        let mut grids = Vec::with_capacity(self.pairs.len());
        for pair in self.pairs {
            match seed.apply(&pair.input, self.ctx.registry) {
                Ok(Some(out)) => grids.push(out),
                Ok(None) => return,
                Err(e) => {
                    self.fail(e.into());
                    return;
                }
            }
        }
        if let Some(state) = self.consider(grids, seed, SearchPhase::Recall) {
            self.frontier.mark_visited(&state.hash);
            self.level.push_back(state);
        }
    }

    fn advance_beam(&mut self) {
        if let Some(mut expansion) = self.expanding.take() {
            let Some(step) = expansion.steps.as_mut().and_then(VecDeque::pop_front) else {
                return;
            };
            if !self.admit_step(SearchPhase::Beam) {
                return;
            }
            if let Some(child) = self.try_step(&expansion.state, step, SearchPhase::Beam) {
                self.frontier.push(child);
            }
            self.expanding = Some(expansion);
            return;
        }
        if let Some(state) = self.level.pop_front() {
            let steps = self.steps_for(&state);
            self.expanding = Some(Expansion {
                state,
                steps: Some(steps),
            });
            return;
        }

        self.frontier.prune_to(self.budget.beam_width);
        self.level_depth += 1;
        tracing::debug!(
            level = self.level_depth,
            frontier = self.frontier.len(),
            steps = self.steps,
            "beam level done"
        );
        if !self.clock_ok() {
            return;
        }
        if self.frontier.is_empty() {
            self.terminate(SearchEvent::None { steps: self.steps });
        } else if self.level_depth >= self.budget.max_depth {
            // Best state on top of the stack.
            let mut states = self.frontier.drain_sorted();
            states.reverse();
            self.stack = states
                .into_iter()
                .map(|state| Expansion { state, steps: None })
                .collect();
            self.stage = Stage::Depth;
        } else {
            self.level = self.frontier.drain_sorted().into();
        }
    }

    fn advance_depth(&mut self) {
        let Some(mut frame) = self.stack.pop() else {
            self.terminate(SearchEvent::None { steps: self.steps });
            return;
        };
        if frame.steps.is_none() {
            frame.steps = Some(self.steps_for(&frame.state));
        }
        let Some(step) = frame.steps.as_mut().and_then(VecDeque::pop_front) else {
            return;
        };
        if !self.admit_step(SearchPhase::Depth) {
            return;
        }
        let child = self.try_step(&frame.state, step, SearchPhase::Depth);
        self.stack.push(frame);
        if let Some(child) = child {
            self.frontier.mark_visited(&child.hash);
            if child.depth() < self.budget.max_depth * 2 {
                self.stack.push(Expansion {
                    state: child,
                    steps: None,
                });
            }
        }
    }
}

fn accuracy_micros(state: &SearchState) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let micros = (state.score.cell_accuracy * 1_000_000.0).round() as i64;
    micros
}

impl Iterator for HybridSearch<'_> {
    type Item = SearchEvent;

    fn next(&mut self) -> Option<SearchEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }
            self.advance();
        }
    }
}

// ---------------------------------------------------------------------------
// Drained form
// ---------------------------------------------------------------------------

/// Summary of a drained search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub terminal: SearchEvent,
    pub steps: u64,
    pub elapsed: Duration,
    /// Longest pipeline evaluated.
    pub deepest: usize,
    /// States created.
    pub candidates: u64,
    /// Best cell accuracy seen; 1.0 on a win.
    pub best_accuracy: f64,
}

impl SearchOutcome {
    /// The winning pipeline, if the search won.
    #[must_use]
    pub fn pipeline(&self) -> Option<&Pipeline> {
        match &self.terminal {
            SearchEvent::Win { pipeline, .. } => Some(pipeline),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_win(&self) -> bool {
        self.pipeline().is_some()
    }
}

/// Run a hybrid search to completion.
///
/// # Errors
///
/// [`SearchError::InvalidBudget`] before any step runs;
/// [`SearchError::Kernel`] if the generator violates the registry contract.
pub fn search(
    ctx: SearchContext<'_>,
    pairs: &[TrainingPair],
    budget: HybridBudgetV1,
    seeds: Vec<Pipeline>,
) -> Result<SearchOutcome, SearchError> {
    let mut run = HybridSearch::new(ctx, pairs, budget, seeds)?;
    let terminal = run.by_ref().find(SearchEvent::is_terminal);
    let terminal_is_win = matches!(terminal, Some(SearchEvent::Win { .. }));
    if let Some(error) = run.take_error() {
        return Err(error);
    }
    Ok(SearchOutcome {
        terminal: terminal.unwrap_or(SearchEvent::None { steps: run.steps() }),
        steps: run.steps(),
        elapsed: run.elapsed(),
        deepest: run.deepest(),
        candidates: run.created(),
        best_accuracy: if terminal_is_win { 1.0 } else { run.best_accuracy() },
    })
}
