//! Escalation order: earlier phases short-circuit later ones.

use lock_tests::fixtures::{scenario_a, scenario_c, small_config};
use tessera_harness::{EscalationSolver, SolveStatus};
use tessera_memory::Method;
use tessera_search::NoConvergence;

// ---------------------------------------------------------------------------
// ACCEPTANCE: a validating memory entry means zero chain and hybrid work
// ---------------------------------------------------------------------------

#[test]
fn memory_hit_skips_search() {
    let mut solver = EscalationSolver::new(small_config()).unwrap();
    let first = solver.solve(&scenario_a()).unwrap();
    assert_eq!(first.method, Some(Method::Chain));

    let second = solver.solve(&scenario_a()).unwrap();
    assert_eq!(second.method, Some(Method::Memory));
    assert_eq!(second.stats.invocations(Method::Memory), 1);
    assert_eq!(second.stats.invocations(Method::Chain), 0);
    assert_eq!(second.stats.invocations(Method::Convergence), 0);
    assert_eq!(second.stats.invocations(Method::Hybrid), 0);
    assert_eq!(second.pipeline, first.pipeline);
}

#[test]
fn failure_runs_every_phase_once() {
    let mut solver = EscalationSolver::new(small_config())
        .unwrap()
        .with_convergence(Box::new(NoConvergence));
    let result = solver.solve(&scenario_c()).unwrap();
    assert_ne!(result.status, SolveStatus::Ok);
    for phase in [Method::Memory, Method::Chain, Method::Convergence, Method::Hybrid] {
        assert_eq!(result.stats.invocations(phase), 1, "{phase}");
        assert_eq!(result.stats.hits(phase), 0, "{phase}");
    }
    assert!(result.stats.strategies_tried > 0);
    assert!(result.stats.deepest_pipeline >= 1);
}

#[test]
fn solver_stats_accumulate_across_solves() {
    let mut solver = EscalationSolver::new(small_config()).unwrap();
    solver.solve(&scenario_a()).unwrap();
    solver.solve(&scenario_a()).unwrap();
    let stats = solver.stats();
    assert_eq!(stats.invocations(Method::Memory), 2);
    assert_eq!(stats.invocations(Method::Chain), 1);
    assert_eq!(stats.hits(Method::Chain), 1);
    assert_eq!(stats.hits(Method::Memory), 1);
}

#[test]
fn cancellation_is_a_status() {
    let mut solver = EscalationSolver::new(small_config()).unwrap();
    solver.cancel_token().cancel();
    let result = solver.solve(&scenario_a()).unwrap();
    assert_eq!(result.status, SolveStatus::Cancelled);
    assert_eq!(result.stats.invocations(Method::Hybrid), 0);
}
