//! Cross-process determinism: spawns `solve_fixture` under several
//! environment variants and asserts identical output.

use std::path::Path;
use std::process::Command;

fn workspace_root() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("tests/ exists")
        .parent()
        .expect("workspace root exists")
        .to_string_lossy()
        .to_string()
}

fn run_variant(work_dir: &str, env_overrides: &[(&str, &str)]) -> String {
    let bin = env!("CARGO_BIN_EXE_solve_fixture");
    let mut command = Command::new(bin);
    command
        .current_dir(work_dir)
        .env_remove("LC_ALL")
        .env_remove("LC_COLLATE")
        .env_remove("LANG")
        .env_remove("RUST_LOG");
    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command.output().unwrap_or_else(|e| {
        panic!("failed to spawn {bin} (work_dir={work_dir}, overrides={env_overrides:?}): {e}")
    });
    assert!(
        output.status.success(),
        "solve_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is valid UTF-8")
}

// ACCEPTANCE: solve results do not depend on cwd, locale or ambient env
#[test]
fn crossproc_determinism_env_variants() {
    let root = workspace_root();
    let baseline = run_variant(&root, &[]);

    assert!(baseline.contains("task=scenario_a\nstatus=\"ok\"\nmethod=chain\n"), "{baseline}");
    assert!(baseline.contains("task=scenario_b\nstatus=\"ok\""), "{baseline}");
    assert!(!baseline.contains("task=scenario_c\nstatus=\"ok\""), "{baseline}");
    assert!(baseline.contains("output_0=sha256:"), "{baseline}");
    assert!(baseline.contains("memory_entries=2"), "{baseline}");

    let alt_cwd = std::env::temp_dir();
    let variant_cwd = run_variant(&alt_cwd.to_string_lossy(), &[]);
    assert_eq!(baseline, variant_cwd, "output differs when cwd changes");

    let variant_locale = run_variant(&root, &[("LC_ALL", "C"), ("LANG", "C")]);
    assert_eq!(baseline, variant_locale, "output differs when LC_ALL=C LANG=C");

    let variant_noise = run_variant(
        &root,
        &[("TESSERA_NOISE", "should_not_matter"), ("TZ", "America/New_York"), ("HOME", "/nonexistent")],
    );
    assert_eq!(baseline, variant_noise, "output differs with spurious env vars");
}
