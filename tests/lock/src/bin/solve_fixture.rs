//! Binary that solves the fixed scenarios and prints deterministic
//! output lines for cross-process verification.
//!
//! Usage: `solve_fixture`
//!
//! Output: one `key=value` line per field, per scenario. Elapsed time is
//! omitted.

use lock_tests::fixtures::{scenario_a, scenario_b, scenario_c, small_config, task_json};
use tessera_harness::EscalationSolver;
use tessera_kernel::Task;

fn main() {
    let mut solver = EscalationSolver::new(small_config()).expect("fixture config is valid");
    for fixture in [scenario_a(), scenario_b(), scenario_c()] {
        // Round-trip through the task document so the loader is covered too.
        let task = Task::from_json_str(&fixture.id, &task_json(&fixture)).expect("fixture task parses");
        let result = solver.solve(&task).expect("solve failed");

        println!("task={}", result.task_id);
        println!(
            "status={}",
            serde_json::to_string(&result.status).expect("status serializes")
        );
        println!("method={}", result.method.map_or("none", |m| m.as_str()));
        println!(
            "pipeline={}",
            result.pipeline.as_ref().map_or_else(|| "none".to_string(), ToString::to_string)
        );
        for (i, output) in result.outputs.iter().enumerate() {
            let digest = output.as_ref().map_or_else(|| "none".to_string(), |g| g.content_hash().as_str().to_string());
            println!("output_{i}={digest}");
        }
        println!("steps={}", result.steps);
    }
    println!("memory_entries={}", solver.memory().len());
}
