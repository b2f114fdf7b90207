//! Task fixtures and small solver configurations.
//!
//! The scenarios are fixed; changing one changes what the lock tests pin.

use std::time::Duration;

use tessera_harness::SolverConfig;
use tessera_kernel::grid::grid;
use tessera_kernel::{Task, TestPair, TrainingPair};

/// Scenario A: vertical flip.
#[must_use]
pub fn scenario_a() -> Task {
    Task::new(
        "scenario_a",
        vec![TrainingPair::new(grid(&[[1, 1], [0, 0]]), grid(&[[0, 0], [1, 1]]))],
        vec![TestPair {
            input: grid(&[[2, 2], [3, 3]]),
            output: Some(grid(&[[3, 3], [2, 2]])),
        }],
    )
}

/// Scenario B: color 1 becomes color 2.
#[must_use]
pub fn scenario_b() -> Task {
    Task::new(
        "scenario_b",
        vec![
            TrainingPair::new(grid(&[[1, 0], [0, 1]]), grid(&[[2, 0], [0, 2]])),
            TrainingPair::new(grid(&[[1, 1], [0, 0]]), grid(&[[2, 2], [0, 0]])),
        ],
        vec![TestPair {
            input: grid(&[[0, 1], [1, 0]]),
            output: Some(grid(&[[0, 2], [2, 0]])),
        }],
    )
}

/// Scenario C: a per-pair scramble no catalogue pipeline reproduces.
#[must_use]
pub fn scenario_c() -> Task {
    Task::new(
        "scenario_c",
        vec![
            TrainingPair::new(grid(&[[1, 2], [3, 4]]), grid(&[[4, 1, 2, 3, 9]])),
            TrainingPair::new(grid(&[[5, 6], [7, 8]]), grid(&[[6, 8, 5, 7, 9]])),
        ],
        vec![TestPair {
            input: grid(&[[1, 3], [5, 7]]),
            output: None,
        }],
    )
}

/// Every training output equals its input.
#[must_use]
pub fn unchanged_task() -> Task {
    Task::new(
        "unchanged",
        vec![
            TrainingPair::new(grid(&[[1, 2], [3, 4]]), grid(&[[1, 2], [3, 4]])),
            TrainingPair::new(grid(&[[0, 7, 0]]), grid(&[[0, 7, 0]])),
        ],
        vec![TestPair {
            input: grid(&[[5, 6], [7, 8]]),
            output: Some(grid(&[[5, 6], [7, 8]])),
        }],
    )
}

/// In-memory config with budgets small enough for the suite.
#[must_use]
pub fn small_config() -> SolverConfig {
    let mut config = SolverConfig::in_memory(32);
    config.chain.max_depth = 2;
    config.chain.time_limit = Duration::from_secs(30);
    config.chain_sample_limit = 500;
    config.hybrid.max_depth = 2;
    config.hybrid.max_steps = 400;
    config.hybrid.time_limit = Duration::from_secs(30);
    config.hybrid.beam_width = 8;
    config.hybrid.check_interval = 50;
    config.hybrid.checkpoint_interval = 100;
    config
}

/// The task document for `task`, as `Task::from_json_str` reads it.
///
/// # Panics
///
/// Panics if the task cannot be serialized.
#[must_use]
pub fn task_json(task: &Task) -> String {
    serde_json::to_string(task).expect("task serializes")
}
