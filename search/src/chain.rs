//! Local chain search: bounded lazy enumeration of short pipelines from one
//! root grid.
//!
//! [`ChainCursor`] expands one primitive at a time and yields every new grid
//! it reaches together with the pipeline that produced it. Grids already
//! reached in this walk (by content hash) are skipped, so a cursor never
//! yields the same grid twice. Expansion is lazy: a node's steps are only
//! generated when the walk reaches it.

use std::collections::{BTreeSet, VecDeque};
use std::time::Instant;

use tessera_kernel::digest::hash::ContentHash;
use tessera_kernel::oracle::{score, validate, Score};
use tessera_kernel::{Grid, KernelError, Pipeline, PrimitiveRegistryV1, Step, TrainingPair};

use crate::budget::ChainBudgetV1;
use crate::cancel::CancelToken;
use crate::candidates::{output_colors, palette, CandidateGenerator};
use crate::error::SearchError;

/// Walk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOrder {
    BreadthFirst,
    DepthFirst,
}

/// One yielded candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCandidate {
    pub grid: Grid,
    pub pipeline: Pipeline,
}

/// Why a cursor stopped yielding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStop {
    /// Every node up to `max_depth` was expanded.
    Exhausted,
    /// `max_candidates` were yielded.
    CandidateLimit,
    Timeout,
    Cancelled,
    /// A generator proposed a step the registry rejects.
    Contract(KernelError),
}

struct Frame {
    grid: Grid,
    pipeline: Pipeline,
    /// `None` until the walk first reaches this frame.
    steps: Option<VecDeque<Step>>,
}

/// Lazy candidate enumeration rooted at one grid.
///
/// Breadth-first works the oldest frame and appends children; depth-first
/// works the newest frame, so a child is expanded before its siblings.
pub struct ChainCursor<'a> {
    registry: &'a PrimitiveRegistryV1,
    generator: &'a dyn CandidateGenerator,
    order: ChainOrder,
    budget: ChainBudgetV1,
    deadline: Instant,
    cancel: Option<CancelToken>,
    extra_colors: Vec<u8>,
    frames: VecDeque<Frame>,
    seen: BTreeSet<ContentHash>,
    produced: u64,
    deepest: usize,
    stop: Option<ChainStop>,
}

impl<'a> ChainCursor<'a> {
    /// Start a walk at `root`. The root itself is never yielded.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidBudget`] if any budget field is zero.
    pub fn new(
        root: &Grid,
        registry: &'a PrimitiveRegistryV1,
        generator: &'a dyn CandidateGenerator,
        order: ChainOrder,
        budget: ChainBudgetV1,
    ) -> Result<Self, SearchError> {
        budget.validate()?;
        let mut seen = BTreeSet::new();
        seen.insert(root.content_hash());
        let mut frames = VecDeque::new();
        frames.push_back(Frame {
            grid: root.clone(),
            pipeline: Pipeline::empty(),
            steps: None,
        });
        Ok(Self {
            registry,
            generator,
            order,
            deadline: Instant::now() + budget.time_limit,
            budget,
            cancel: None,
            extra_colors: Vec::new(),
            frames,
            seen,
            produced: 0,
            deepest: 0,
            stop: None,
        })
    }

    /// Colors offered to the generator in addition to the current grid's.
    #[must_use]
    pub fn with_extra_colors(mut self, colors: Vec<u8>) -> Self {
        self.extra_colors = colors;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Candidates yielded so far.
    #[must_use]
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Longest pipeline yielded so far.
    #[must_use]
    pub fn deepest(&self) -> usize {
        self.deepest
    }

    /// Set once the cursor has stopped.
    #[must_use]
    pub fn stop_reason(&self) -> Option<&ChainStop> {
        self.stop.as_ref()
    }

    fn halt(&mut self, reason: ChainStop) -> Option<ChainCandidate> {
        self.stop = Some(reason);
        self.frames.clear();
        None
    }

    fn retire_active(&mut self) {
        match self.order {
            ChainOrder::BreadthFirst => self.frames.pop_front(),
            ChainOrder::DepthFirst => self.frames.pop_back(),
        };
    }
}

impl Iterator for ChainCursor<'_> {
    type Item = ChainCandidate;

    fn next(&mut self) -> Option<ChainCandidate> {
        loop {
            if self.stop.is_some() {
                return None;
            }
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return self.halt(ChainStop::Cancelled);
            }
            if Instant::now() >= self.deadline {
                return self.halt(ChainStop::Timeout);
            }
            if self.produced >= self.budget.max_candidates {
                return self.halt(ChainStop::CandidateLimit);
            }

            let generator = self.generator;
            let frame = match self.order {
                ChainOrder::BreadthFirst => self.frames.front_mut(),
                ChainOrder::DepthFirst => self.frames.back_mut(),
            };
            let Some(frame) = frame else {
                return self.halt(ChainStop::Exhausted);
            };
            let extra = &self.extra_colors;
            let steps = frame.steps.get_or_insert_with(|| {
                let colors = palette([&frame.grid], extra);
                generator.candidates(std::slice::from_ref(&frame.grid), &colors).into()
            });
            let Some(step) = steps.pop_front() else {
                self.retire_active();
                continue;
            };
            let (grid, pipeline) = (frame.grid.clone(), frame.pipeline.clone());

            let out = match step.apply(&grid, self.registry) {
                Ok(Some(out)) => out,
                Ok(None) => continue,
                Err(e) => return self.halt(ChainStop::Contract(e)),
            };
            if !self.seen.insert(out.content_hash()) {
                continue;
            }
            let pipeline = pipeline.then(step);
            if pipeline.depth() < self.budget.max_depth {
                self.frames.push_back(Frame {
                    grid: out.clone(),
                    pipeline: pipeline.clone(),
                    steps: None,
                });
            }
            self.produced += 1;
            self.deepest = self.deepest.max(pipeline.depth());
            return Some(ChainCandidate { grid: out, pipeline });
        }
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Result of [`find_valid_chain`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    pub found: Option<Pipeline>,
    /// Candidates the cursor yielded.
    pub candidates: u64,
    /// Longest pipeline yielded.
    pub deepest: usize,
    /// `None` when the walk ended on a validated candidate.
    pub stop: Option<ChainStop>,
}

/// A scored candidate pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedChain {
    pub pipeline: Pipeline,
    pub score: Score,
}

impl RankedChain {
    /// Integer ordering key; larger is better.
    fn key(&self) -> (i64, usize) {
        #[allow(clippy::cast_possible_truncation)]
        let micros = (self.score.cell_accuracy * 1_000_000.0).round() as i64;
        (micros, self.score.exact_pairs)
    }
}

/// Options shared by the chain drivers.
#[derive(Clone, Copy)]
pub struct ChainSearch<'a> {
    pub registry: &'a PrimitiveRegistryV1,
    pub generator: &'a dyn CandidateGenerator,
    pub budget: ChainBudgetV1,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> ChainSearch<'a> {
    /// The empty pipeline, when every training output already equals its
    /// input. The cursor never yields its root, so this is checked first.
    fn root_solution(&self, pairs: &[TrainingPair]) -> Result<Option<RankedChain>, SearchError> {
        let root = Pipeline::empty();
        let s = score(&root, pairs, self.registry)?;
        Ok((!pairs.is_empty() && s.is_perfect()).then_some(RankedChain { pipeline: root, score: s }))
    }

    fn cursor(&self, pairs: &[TrainingPair], order: ChainOrder) -> Result<Option<ChainCursor<'a>>, SearchError> {
        self.budget.validate()?;
        let Some(first) = pairs.first() else {
            return Ok(None);
        };
        let mut cursor = ChainCursor::new(&first.input, self.registry, self.generator, order, self.budget)?
            .with_extra_colors(output_colors(pairs));
        if let Some(cancel) = self.cancel {
            cursor = cursor.with_cancel(cancel.clone());
        }
        Ok(Some(cursor))
    }
}

/// Walk breadth-first from the first training input and return the first
/// candidate that validates against every pair.
///
/// Only candidates that already reproduce pair one are run through the
/// oracle: the transformation found there must generalize.
///
/// # Errors
///
/// [`SearchError::InvalidBudget`] for a zero budget field;
/// [`SearchError::Kernel`] if the generator violates the registry contract.
pub fn find_valid_chain(search: &ChainSearch<'_>, pairs: &[TrainingPair]) -> Result<ChainReport, SearchError> {
    let Some(mut cursor) = search.cursor(pairs, ChainOrder::BreadthFirst)? else {
        return Ok(ChainReport {
            found: None,
            candidates: 0,
            deepest: 0,
            stop: Some(ChainStop::Exhausted),
        });
    };
    if let Some(root) = search.root_solution(pairs)? {
        return Ok(ChainReport {
            found: Some(root.pipeline),
            candidates: 0,
            deepest: 0,
            stop: None,
        });
    }
    let target = &pairs[0].output;
    while let Some(candidate) = cursor.next() {
        if candidate.grid != *target {
            continue;
        }
        if validate(&candidate.pipeline, pairs, search.registry)? {
            tracing::debug!(pipeline = %candidate.pipeline, candidates = cursor.produced(), "chain validated");
            return Ok(ChainReport {
                found: Some(candidate.pipeline),
                candidates: cursor.produced(),
                deepest: cursor.deepest(),
                stop: None,
            });
        }
    }
    let stop = cursor.stop_reason().cloned();
    if let Some(ChainStop::Contract(e)) = stop {
        return Err(SearchError::Kernel(e));
    }
    Ok(ChainReport {
        found: None,
        candidates: cursor.produced(),
        deepest: cursor.deepest(),
        stop,
    })
}

/// Result of [`rank_chains`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChainRanking {
    /// Best first.
    pub ranked: Vec<RankedChain>,
    /// Candidates scored.
    pub candidates: u64,
    /// Longest pipeline scored.
    pub deepest: usize,
}

/// Score up to `sample_limit` breadth-first candidates against every pair
/// and keep the `top_n` best, best first. Stops early on a perfect score.
///
/// Ties keep enumeration order.
///
/// # Errors
///
/// As [`find_valid_chain`].
pub fn rank_chains(
    search: &ChainSearch<'_>,
    pairs: &[TrainingPair],
    sample_limit: usize,
    top_n: usize,
) -> Result<ChainRanking, SearchError> {
    let Some(mut cursor) = search.cursor(pairs, ChainOrder::BreadthFirst)? else {
        return Ok(ChainRanking::default());
    };
    if let Some(root) = search.root_solution(pairs)? {
        return Ok(ChainRanking {
            ranked: vec![root],
            candidates: 0,
            deepest: 0,
        });
    }
    let mut ranked: Vec<RankedChain> = Vec::new();
    for candidate in cursor.by_ref().take(sample_limit) {
        let s = score(&candidate.pipeline, pairs, search.registry)?;
        let perfect = s.is_perfect();
        let entry = RankedChain {
            pipeline: candidate.pipeline,
            score: s,
        };
        let at = ranked.partition_point(|r| r.key() >= entry.key());
        if at < top_n {
            ranked.insert(at, entry);
            ranked.truncate(top_n);
        }
        if perfect {
            break;
        }
    }
    if let Some(ChainStop::Contract(e)) = cursor.stop_reason() {
        return Err(SearchError::Kernel(e.clone()));
    }
    Ok(ChainRanking {
        ranked,
        candidates: cursor.produced(),
        deepest: cursor.deepest(),
    })
}

/// The single best of up to `sample_limit` candidates, if any was produced.
///
/// # Errors
///
/// As [`find_valid_chain`].
pub fn find_best_chain(
    search: &ChainSearch<'_>,
    pairs: &[TrainingPair],
    sample_limit: usize,
) -> Result<Option<RankedChain>, SearchError> {
    Ok(rank_chains(search, pairs, sample_limit, 1)?.ranked.into_iter().next())
}
