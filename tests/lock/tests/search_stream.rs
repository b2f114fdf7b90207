//! Hybrid search stream lock tests: terminal events, budgets, checkpoints.

use std::time::Duration;

use lock_tests::fixtures::{scenario_a, scenario_c, unchanged_task};
use tessera_kernel::{standard_registry, Pipeline};
use tessera_search::{
    search, CheckpointError, CheckpointSink, CheckpointV1, FileSink, HybridBudgetV1, HybridSearch, RegistryGenerator,
    SearchContext, SearchError, SearchEvent, CHECKPOINT_SCHEMA_VERSION,
};

fn budget() -> HybridBudgetV1 {
    HybridBudgetV1 {
        max_depth: 2,
        max_steps: 300,
        time_limit: Duration::from_secs(30),
        beam_width: 6,
        check_interval: 25,
        checkpoint_interval: 50,
    }
}

/// Every event except progress, which carries wall-clock time.
fn stable_events(events: &[SearchEvent]) -> Vec<SearchEvent> {
    events
        .iter()
        .filter(|e| !matches!(e, SearchEvent::Progress { .. }))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: the stream ends with exactly one terminal event
// ---------------------------------------------------------------------------

#[test]
fn exactly_one_terminal_event() {
    let reg = standard_registry();
    let generator = RegistryGenerator::new(reg.clone());
    for task in [scenario_a(), scenario_c()] {
        let events: Vec<SearchEvent> =
            HybridSearch::new(SearchContext::new(&reg, &generator), &task.train, budget(), Vec::new())
                .unwrap()
                .collect();
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1, "task {}", task.id);
        assert!(events.last().is_some_and(SearchEvent::is_terminal), "task {}", task.id);
    }
}

#[test]
fn stream_is_deterministic() {
    let reg = standard_registry();
    let generator = RegistryGenerator::new(reg.clone());
    let task = scenario_c();
    let run = || -> Vec<SearchEvent> {
        HybridSearch::new(SearchContext::new(&reg, &generator), &task.train, budget(), Vec::new())
            .unwrap()
            .collect()
    };
    assert_eq!(stable_events(&run()), stable_events(&run()));
}

#[test]
fn events_serialize_with_tag() {
    let json = serde_json::to_value(SearchEvent::Limit { steps: 7 }).unwrap();
    assert_eq!(json, serde_json::json!({ "event": "limit", "steps": 7 }));
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: incomplete budgets are rejected before the search runs
// ---------------------------------------------------------------------------

#[test]
fn budget_missing_fields_fail_to_parse() {
    let partial = r#"{"max_depth": 2, "max_steps": 10}"#;
    assert!(serde_json::from_str::<HybridBudgetV1>(partial).is_err());
    let full = serde_json::to_string(&budget()).unwrap();
    assert_eq!(serde_json::from_str::<HybridBudgetV1>(&full).unwrap(), budget());
}

#[test]
fn zero_budget_fields_are_rejected() {
    let reg = standard_registry();
    let generator = RegistryGenerator::new(reg.clone());
    let task = scenario_a();
    for zeroed in [
        HybridBudgetV1 { max_depth: 0, ..budget() },
        HybridBudgetV1 { max_steps: 0, ..budget() },
        HybridBudgetV1 { time_limit: Duration::ZERO, ..budget() },
        HybridBudgetV1 { beam_width: 0, ..budget() },
        HybridBudgetV1 { check_interval: 0, ..budget() },
    ] {
        let err = search(SearchContext::new(&reg, &generator), &task.train, zeroed, Vec::new()).unwrap_err();
        assert!(matches!(err, SearchError::InvalidBudget { .. }), "{zeroed:?}");
    }
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: checkpoint sink failures do not change the outcome
// ---------------------------------------------------------------------------

struct BrokenSink;

impl CheckpointSink for BrokenSink {
    fn write(&self, _: &CheckpointV1) -> Result<(), CheckpointError> {
        Err(CheckpointError::Unavailable {
            detail: "read-only volume".into(),
        })
    }
}

#[test]
fn broken_sink_same_outcome() {
    let reg = standard_registry();
    let generator = RegistryGenerator::new(reg.clone());
    let task = scenario_c();
    let plain = search(SearchContext::new(&reg, &generator), &task.train, budget(), Vec::new()).unwrap();
    let broken = search(
        SearchContext::new(&reg, &generator).with_checkpoints(&BrokenSink),
        &task.train,
        budget(),
        Vec::new(),
    )
    .unwrap();
    assert_eq!(plain.terminal, broken.terminal);
    assert_eq!(plain.steps, broken.steps);
    assert_eq!(plain.candidates, broken.candidates);
}

#[test]
fn file_sink_leaves_latest_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("search.checkpoint.json");
    let sink = FileSink::new(&path);
    let reg = standard_registry();
    let generator = RegistryGenerator::new(reg.clone());
    let task = scenario_c();
    let outcome = search(
        SearchContext::new(&reg, &generator).with_checkpoints(&sink),
        &task.train,
        budget(),
        Vec::new(),
    )
    .unwrap();
    assert!(outcome.steps >= 50);
    let checkpoint = FileSink::read(&path).unwrap();
    assert_eq!(checkpoint.schema_version, CHECKPOINT_SCHEMA_VERSION);
    assert!(checkpoint.steps <= outcome.steps);
    assert!(checkpoint.steps.is_multiple_of(50));
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: unchanged outputs win without exhausting the step budget
// ---------------------------------------------------------------------------

#[test]
fn unchanged_task_wins_at_the_root() {
    let reg = standard_registry();
    let generator = RegistryGenerator::new(reg.clone());
    let task = unchanged_task();
    let outcome = search(SearchContext::new(&reg, &generator), &task.train, budget(), Vec::new()).unwrap();
    assert_eq!(outcome.pipeline(), Some(&Pipeline::empty()));
    assert_eq!(outcome.steps, 0);
}
