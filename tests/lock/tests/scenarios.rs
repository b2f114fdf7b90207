//! Scenario lock tests: the fixed tasks A, B and C through both solvers.

use lock_tests::fixtures::{scenario_a, scenario_b, scenario_c, small_config, unchanged_task};
use tessera_harness::{AdaptiveSwarmSolver, EscalationSolver, SolveStatus};
use tessera_kernel::grid::grid;
use tessera_kernel::oracle::validate;
use tessera_kernel::{standard_registry, Pipeline, Step};
use tessera_memory::Method;

// ---------------------------------------------------------------------------
// ACCEPTANCE: scenario A (vertical flip)
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_escalation() {
    let mut solver = EscalationSolver::new(small_config()).unwrap();
    let result = solver.solve(&scenario_a()).unwrap();
    assert_eq!(result.status, SolveStatus::Ok);
    assert_eq!(result.method, Some(Method::Chain));
    assert_eq!(result.pipeline.as_ref().map(Pipeline::depth), Some(1));
    assert_eq!(result.outputs, vec![Some(grid(&[[3, 3], [2, 2]]))]);
    assert_eq!(result.correct, vec![Some(true)]);
}

#[test]
fn scenario_a_swarm() {
    let mut solver = AdaptiveSwarmSolver::new(small_config()).unwrap();
    let result = solver.solve(&scenario_a()).unwrap();
    assert!(result.is_ok());
    assert!(result.all_correct());
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: scenario B (color remap)
// ---------------------------------------------------------------------------

#[test]
fn scenario_b_replace_validates() {
    let task = scenario_b();
    let replace = Pipeline::new(vec![Step::new("replace", vec![1, 2])]);
    assert!(validate(&replace, &task.train, &standard_registry()).unwrap());
}

#[test]
fn scenario_b_escalation() {
    let mut solver = EscalationSolver::new(small_config()).unwrap();
    let result = solver.solve(&scenario_b()).unwrap();
    assert_eq!(result.status, SolveStatus::Ok);
    assert_eq!(result.outputs, vec![Some(grid(&[[0, 2], [2, 0]]))]);
    assert!(result.all_correct());
    assert_eq!(result.method, Some(Method::Chain));
    assert_eq!(result.pipeline, Some(Pipeline::new(vec![Step::new("replace", vec![1, 2])])));
}

#[test]
fn scenario_b_swarm() {
    let mut solver = AdaptiveSwarmSolver::new(small_config()).unwrap();
    let result = solver.solve(&scenario_b()).unwrap();
    assert!(result.is_ok());
    assert!(result.all_correct());
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: scenario C (outside the catalogue) never reports ok
// ---------------------------------------------------------------------------

#[test]
fn scenario_c_escalation_is_bounded_failure() {
    let mut solver = EscalationSolver::new(small_config()).unwrap();
    let result = solver.solve(&scenario_c()).unwrap();
    assert!(
        matches!(result.status, SolveStatus::Fail | SolveStatus::Limit),
        "unexpected status {:?}",
        result.status
    );
    assert_eq!(result.method, None);
    assert_eq!(result.outputs, vec![None]);
    assert_eq!(result.stats.invocations(Method::Hybrid), 1);
}

#[test]
fn scenario_c_swarm_is_bounded_failure() {
    let mut solver = AdaptiveSwarmSolver::new(small_config()).unwrap();
    let result = solver.solve(&scenario_c()).unwrap();
    assert!(matches!(result.status, SolveStatus::Fail | SolveStatus::Limit));
    assert_eq!(result.pipeline, None);
}

#[test]
fn result_serializes_with_lowercase_status() {
    let mut solver = EscalationSolver::new(small_config()).unwrap();
    let result = solver.solve(&scenario_a()).unwrap();
    let json: serde_json::Value = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["method"], "chain");
    assert!(json["elapsed_ms"].is_u64());
    assert_eq!(json["outputs"][0], serde_json::json!([[3, 3], [2, 2]]));
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: a task whose outputs equal its inputs is solved, not limited
// ---------------------------------------------------------------------------

#[test]
fn unchanged_task_escalation() {
    let mut config = small_config();
    config.hybrid.max_steps = 2_000;
    let mut solver = EscalationSolver::new(config).unwrap();
    let result = solver.solve(&unchanged_task()).unwrap();
    assert_eq!(result.status, SolveStatus::Ok);
    assert_eq!(result.method, Some(Method::Chain));
    assert_eq!(result.pipeline, Some(Pipeline::empty()));
    assert_eq!(result.outputs, vec![Some(grid(&[[5, 6], [7, 8]]))]);
    assert!(result.all_correct());

    let again = solver.solve(&unchanged_task()).unwrap();
    assert_eq!(again.method, Some(Method::Memory));
}

#[test]
fn unchanged_task_swarm() {
    let mut solver = AdaptiveSwarmSolver::new(small_config()).unwrap();
    let result = solver.solve(&unchanged_task()).unwrap();
    assert_eq!(result.status, SolveStatus::Ok);
    assert_eq!(result.pipeline, Some(Pipeline::empty()));
    assert!(result.all_correct());
}
