//! Search states: one current grid per training input plus the pipeline
//! that produced them.

use tessera_kernel::digest::hash::{canonical_hash, ContentHash};
use tessera_kernel::digest::hash_domain::HashDomain;
use tessera_kernel::oracle::{score_outputs, Score};
use tessera_kernel::{Grid, Pipeline, TrainingPair};

/// An immutable frontier node.
///
/// Ordering for beam pruning uses `(rank desc, depth asc, creation_order
/// asc)`: better first, ties broken by shallower depth, then older creation.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub grids: Vec<Grid>,
    pub pipeline: Pipeline,
    pub score: Score,
    /// Integer rank in millionths; higher is better.
    pub rank: i64,
    /// Hash over all current grids, for dedup.
    pub hash: ContentHash,
    /// Global counter for deterministic tie-breaking.
    pub creation_order: u64,
}

impl SearchState {
    /// Build a state, scoring `grids` against `pairs`. `bonus` is added to
    /// the mean cell accuracy before ranking.
    #[must_use]
    pub fn new(grids: Vec<Grid>, pipeline: Pipeline, pairs: &[TrainingPair], bonus: f64, creation_order: u64) -> Self {
        let refs: Vec<Option<&Grid>> = grids.iter().map(Some).collect();
        let score = score_outputs(&refs, pairs);
        let hash = state_hash(&grids);
        #[allow(clippy::cast_possible_truncation)]
        let rank = ((score.cell_accuracy + bonus) * 1_000_000.0).round() as i64;
        Self {
            grids,
            pipeline,
            score,
            rank,
            hash,
            creation_order,
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.pipeline.depth()
    }

    /// Every grid equals its training output.
    #[must_use]
    pub fn solves(&self, pairs: &[TrainingPair]) -> bool {
        !pairs.is_empty()
            && self.grids.len() == pairs.len()
            && self.grids.iter().zip(pairs).all(|(g, p)| *g == p.output)
    }

    /// Frontier ordering key; smaller sorts first.
    #[must_use]
    pub fn key(&self) -> (std::cmp::Reverse<i64>, usize, u64) {
        (std::cmp::Reverse(self.rank), self.depth(), self.creation_order)
    }
}

/// Canonical hash of a set of grids: count (u32 LE) then each grid's
/// identity bytes, each prefixed with its length (u32 LE).
#[must_use]
pub fn state_hash(grids: &[Grid]) -> ContentHash {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&u32::try_from(grids.len()).unwrap_or(u32::MAX).to_le_bytes());
    for g in grids {
        let id = g.identity_bytes();
        bytes.extend_from_slice(&u32::try_from(id.len()).unwrap_or(u32::MAX).to_le_bytes());
        bytes.extend_from_slice(&id);
    }
    canonical_hash(HashDomain::SearchState, &bytes)
}
