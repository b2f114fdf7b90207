//! Validation oracle: does a pipeline reproduce every training pair?
//!
//! `validate` is all-or-nothing and short-circuits. `score` always completes
//! and reports partial agreement, which is what near-miss recording and beam
//! ranking consume.

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::pipeline::Pipeline;
use crate::primitives::apply::KernelError;
use crate::primitives::registry::PrimitiveRegistryV1;
use crate::task::TrainingPair;

/// `true` only if the pipeline maps every training input to exactly its
/// output. An empty pair list has nothing to reproduce and is `false`.
///
/// # Errors
///
/// Propagates [`KernelError`] for unknown names or wrong arity.
pub fn validate(
    pipeline: &Pipeline,
    pairs: &[TrainingPair],
    registry: &PrimitiveRegistryV1,
) -> Result<bool, KernelError> {
    if pairs.is_empty() {
        return Ok(false);
    }
    for pair in pairs {
        match pipeline.apply(&pair.input, registry)? {
            Some(out) if out == pair.output => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// Partial agreement of a pipeline (or a set of produced grids) with the
/// training outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Pairs reproduced exactly.
    pub exact_pairs: usize,
    /// Pairs scored.
    pub total_pairs: usize,
    /// Matched cells / expected cells over all pairs, in `[0, 1]`.
    pub cell_accuracy: f64,
}

impl Score {
    /// Score of a candidate that produced nothing.
    #[must_use]
    pub fn zero(total_pairs: usize) -> Self {
        Self {
            exact_pairs: 0,
            total_pairs,
            cell_accuracy: 0.0,
        }
    }

    /// Every pair reproduced.
    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total_pairs > 0 && self.exact_pairs == self.total_pairs
    }
}

/// Cells equal between `actual` and `expected`; zero when shapes differ.
#[must_use]
pub fn matching_cells(actual: &Grid, expected: &Grid) -> usize {
    if actual.dims() != expected.dims() {
        return 0;
    }
    actual
        .cells()
        .iter()
        .zip(expected.cells())
        .filter(|(a, b)| a == b)
        .count()
}

/// Score already-produced grids, one per pair, against the outputs.
/// `None` entries (inapplicable) contribute zero matched cells.
#[must_use]
pub fn score_outputs(produced: &[Option<&Grid>], pairs: &[TrainingPair]) -> Score {
    let mut exact_pairs = 0;
    let mut matched = 0usize;
    let mut expected = 0usize;
    for (out, pair) in produced.iter().zip(pairs) {
        expected += pair.output.area();
        if let Some(out) = out {
            if *out == &pair.output {
                exact_pairs += 1;
            }
            matched += matching_cells(out, &pair.output);
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let cell_accuracy = if expected == 0 {
        0.0
    } else {
        matched as f64 / expected as f64
    };
    Score {
        exact_pairs,
        total_pairs: pairs.len(),
        cell_accuracy,
    }
}

/// Apply `pipeline` to every training input and score the results.
///
/// # Errors
///
/// Propagates [`KernelError`] for unknown names or wrong arity.
pub fn score(
    pipeline: &Pipeline,
    pairs: &[TrainingPair],
    registry: &PrimitiveRegistryV1,
) -> Result<Score, KernelError> {
    let produced = pairs
        .iter()
        .map(|pair| pipeline.apply(&pair.input, registry))
        .collect::<Result<Vec<_>, _>>()?;
    let refs: Vec<Option<&Grid>> = produced.iter().map(Option::as_ref).collect();
    Ok(score_outputs(&refs, pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::grid;
    use crate::pipeline::Step;
    use crate::primitives::registry::standard_registry;

    fn flip_pairs() -> Vec<TrainingPair> {
        vec![
            TrainingPair::new(grid(&[[1, 1], [0, 0]]), grid(&[[0, 0], [1, 1]])),
            TrainingPair::new(grid(&[[2, 0], [0, 0]]), grid(&[[0, 0], [2, 0]])),
        ]
    }

    #[test]
    fn validates_exact_solution() {
        let reg = standard_registry();
        let p = Pipeline::new(vec![Step::nullary("flip_v")]);
        assert!(validate(&p, &flip_pairs(), &reg).unwrap());
    }

    #[test]
    fn single_cell_mismatch_fails() {
        let reg = standard_registry();
        let mut pairs = flip_pairs();
        pairs[1].output = grid(&[[0, 0], [2, 1]]);
        let p = Pipeline::new(vec![Step::nullary("flip_v")]);
        assert!(!validate(&p, &pairs, &reg).unwrap());
        let s = score(&p, &pairs, &reg).unwrap();
        assert_eq!(s.exact_pairs, 1);
        assert!((s.cell_accuracy - 7.0 / 8.0).abs() < 1e-9);
        assert!(!s.is_perfect());
    }

    #[test]
    fn empty_pairs_never_validate() {
        let reg = standard_registry();
        assert!(!validate(&Pipeline::empty(), &[], &reg).unwrap());
        assert!(!score(&Pipeline::empty(), &[], &reg).unwrap().is_perfect());
    }

    #[test]
    fn wrong_shape_scores_zero_cells() {
        let reg = standard_registry();
        let p = Pipeline::new(vec![Step::nullary("transpose")]);
        let pairs = vec![TrainingPair::new(grid(&[[1, 2]]), grid(&[[1, 2]]))];
        let s = score(&p, &pairs, &reg).unwrap();
        assert!(s.cell_accuracy.abs() < f64::EPSILON);
    }

    #[test]
    fn absent_output_scores_zero() {
        let reg = standard_registry();
        let p = Pipeline::new(vec![Step::nullary("crop")]);
        let pairs = vec![TrainingPair::new(grid(&[[0]]), grid(&[[0]]))];
        assert!(!validate(&p, &pairs, &reg).unwrap());
        assert_eq!(score(&p, &pairs, &reg).unwrap(), Score::zero(1));
    }

    #[test]
    fn contract_errors_propagate() {
        let reg = standard_registry();
        let p = Pipeline::new(vec![Step::new("fill", vec![])]);
        assert!(validate(&p, &flip_pairs(), &reg).is_err());
        assert!(score(&p, &flip_pairs(), &reg).is_err());
    }
}
