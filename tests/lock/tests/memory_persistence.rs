//! Memory lock tests: capacity, persistence round trip, corrupt documents
//! and the advisory lock, exercised through the solver.

use std::path::Path;

use lock_tests::fixtures::{scenario_a, scenario_b, small_config};
use tessera_harness::{EscalationSolver, SolverConfig};
use tessera_kernel::grid::grid;
use tessera_kernel::{standard_registry, Grid, Pipeline, Step, TrainingPair};
use tessera_memory::{fingerprint, Fingerprint, MemoryStore, Method, Outcome, MEMORY_FILE, STALE_LOCK_AGE};

fn persistent_config(dir: &Path) -> SolverConfig {
    let mut config = small_config();
    config.memory.dir = Some(dir.to_path_buf());
    config
}

/// Distinct size ratios give distinct fingerprints.
fn widening_fingerprint(width: usize) -> Fingerprint {
    fingerprint(&[TrainingPair::new(grid(&[[1]]), Grid::filled(1, width, 1).unwrap())])
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: capacity keeps exactly `capacity` entries, the highest scored
// ---------------------------------------------------------------------------

#[test]
fn capacity_keeps_highest_scored() {
    let mut store = MemoryStore::in_memory(3, &standard_registry()).unwrap();
    let tile = Pipeline::new(vec![Step::new("tile", vec![2])]);
    let fps: Vec<Fingerprint> = (2..=7).map(widening_fingerprint).collect();

    // The first three earn repeated hits and outscore the rest.
    for fp in &fps[..3] {
        for _ in 0..4 {
            store.distill(fp, &tile, Method::Chain, Outcome::Success);
        }
    }
    for fp in &fps[3..] {
        store.distill(fp, &tile, Method::Chain, Outcome::Success);
    }

    assert_eq!(store.len(), 3);
    for fp in &fps[..3] {
        assert!(store.get(&fp.hash).is_some());
    }
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: memory documents survive a save / reopen cycle
// ---------------------------------------------------------------------------

#[test]
fn solved_task_is_recalled_by_a_new_solver() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut solver = EscalationSolver::new(persistent_config(dir.path())).unwrap();
        assert!(solver.solve(&scenario_a()).unwrap().is_ok());
        assert!(solver.save_memory());
    }
    assert!(dir.path().join(MEMORY_FILE).exists());

    let mut solver = EscalationSolver::new(persistent_config(dir.path())).unwrap();
    assert_eq!(solver.memory().len(), 1);
    let result = solver.solve(&scenario_a()).unwrap();
    assert_eq!(result.method, Some(Method::Memory));
}

#[test]
fn two_solvers_merge_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = EscalationSolver::new(persistent_config(dir.path())).unwrap();
    let mut second = EscalationSolver::new(persistent_config(dir.path())).unwrap();
    first.solve(&scenario_a()).unwrap();
    second.solve(&scenario_b()).unwrap();
    assert!(first.save_memory());
    assert!(second.save_memory());

    let reopened = EscalationSolver::new(persistent_config(dir.path())).unwrap();
    assert_eq!(reopened.memory().len(), 2);
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: a corrupt document loads empty
// ---------------------------------------------------------------------------

#[test]
fn corrupt_memory_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(MEMORY_FILE), b"{ not json").unwrap();
    let mut solver = EscalationSolver::new(persistent_config(dir.path())).unwrap();
    assert_eq!(solver.memory().len(), 0);
    let result = solver.solve(&scenario_a()).unwrap();
    assert_eq!(result.method, Some(Method::Chain));
    assert!(solver.save_memory());
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: a held lock makes save skip without error
// ---------------------------------------------------------------------------

#[test]
fn held_lock_skips_save() {
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join(format!("{MEMORY_FILE}.lock"));
    std::fs::write(&lock, b"").unwrap();

    let mut solver = EscalationSolver::new(persistent_config(dir.path())).unwrap();
    solver.solve(&scenario_a()).unwrap();
    assert!(!solver.save_memory());
    assert!(!dir.path().join(MEMORY_FILE).exists());
    assert_eq!(solver.memory().len(), 1);

    std::fs::remove_file(&lock).unwrap();
    assert!(solver.save_memory());
}

// ACCEPTANCE: a lock left by a crashed process does not disable persistence
#[test]
fn abandoned_lock_does_not_block_save() {
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join(format!("{MEMORY_FILE}.lock"));
    let file = std::fs::File::create(&lock).unwrap();
    file.set_modified(std::time::SystemTime::now() - STALE_LOCK_AGE * 3).unwrap();
    drop(file);

    let mut solver = EscalationSolver::new(persistent_config(dir.path())).unwrap();
    solver.solve(&scenario_a()).unwrap();
    assert!(solver.save_memory());
    assert!(dir.path().join(MEMORY_FILE).exists());
    assert!(!lock.exists());
}

#[test]
fn in_memory_solver_never_writes() {
    let mut solver = EscalationSolver::new(small_config()).unwrap();
    solver.solve(&scenario_a()).unwrap();
    assert!(!solver.save_memory());
}
