//! Shared inputs for the tessera benchmark suites.
//!
//! Grids are generated from a fixed linear congruential sequence so every
//! run measures the same work.

use std::time::Duration;

use tessera_harness::SolverConfig;
use tessera_kernel::{Grid, Task, TestPair, TrainingPair};
use tessera_search::{ChainBudgetV1, HybridBudgetV1};

/// Deterministic `rows × cols` grid over colors `0..=9`.
#[must_use]
pub fn patterned_grid(rows: usize, cols: usize, seed: u64) -> Option<Grid> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    Grid::from_fn(rows, cols, |_, _| {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        u8::try_from((state >> 33) % 10).unwrap_or(0)
    })
}

/// A task solved by `rotate_90` then `flip_h`, on `side × side` grids.
#[must_use]
pub fn two_step_task(side: usize) -> Option<Task> {
    let registry = tessera_kernel::standard_registry();
    let pipeline: tessera_kernel::Pipeline = ["rotate_90", "flip_h"]
        .into_iter()
        .map(tessera_kernel::Step::nullary)
        .collect();
    let mut train = Vec::new();
    for seed in 0..3 {
        let input = patterned_grid(side, side, seed)?;
        let output = pipeline.apply(&input, &registry).ok()??;
        train.push(TrainingPair::new(input, output));
    }
    let test = vec![TestPair {
        input: patterned_grid(side, side, 99)?,
        output: None,
    }];
    Some(Task::new(format!("two_step_{side}"), train, test))
}

#[must_use]
pub fn chain_budget() -> ChainBudgetV1 {
    ChainBudgetV1 {
        max_depth: 2,
        max_candidates: 50_000,
        time_limit: Duration::from_secs(60),
    }
}

#[must_use]
pub fn hybrid_budget() -> HybridBudgetV1 {
    HybridBudgetV1 {
        max_depth: 2,
        max_steps: 20_000,
        time_limit: Duration::from_secs(60),
        beam_width: 16,
        check_interval: 500,
        checkpoint_interval: 5_000,
    }
}

/// In-memory solver config; memory capacity 1 keeps recall cheap.
#[must_use]
pub fn solver_config() -> SolverConfig {
    SolverConfig {
        chain: chain_budget(),
        hybrid: hybrid_budget(),
        ..SolverConfig::in_memory(1)
    }
}
