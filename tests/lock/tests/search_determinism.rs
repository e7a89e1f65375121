//! End-to-end run determinism, in process and across processes.
//!
//! The cross-process test spawns the `search_fixture` binary under several
//! environment variants and asserts all produce identical output.

use std::path::Path;
use std::process::Command;

use gridsynth_harness::policy::PolicyConfig;
use gridsynth_harness::record::RunRecord;
use gridsynth_harness::runner::{run, RunError};
use gridsynth_kernel::dsl::encode;
use gridsynth_search::policy::{CebsConfig, MethodConfig, SpaceConfig};
use gridsynth_search::space::LatentSpaceConfig;
use gridsynth_search::DriverStop;
use lock_tests::fixtures::{karel_program, small_policy};

/// Picks the trail marker, then steps north if the trail continues there,
/// otherwise east. Solves every path-following map.
const TRAIL_SOLVER: &str = "DEF run m( WHILE c( markersPresent c) w( pickMarker \
    IFELSE c( frontIsClear c) i( move IF c( noMarkersPresent c) i( turnLeft turnLeft move turnLeft move turnLeft i) i) \
    ELSE e( turnRight move turnLeft e) w) m)";

fn latent_cebs_policy() -> PolicyConfig {
    PolicyConfig {
        seed: 9,
        budget: Some(200),
        method: MethodConfig::Cebs(CebsConfig {
            k: 8,
            e: 2,
            ..CebsConfig::default()
        }),
        space: SpaceConfig::Latent(LatentSpaceConfig::default()),
        ..small_policy()
    }
}

// ACCEPTANCE: same policy, same record
#[test]
fn identical_policies_produce_identical_records() {
    let first = run(&small_policy(), &[]).expect("valid policy");
    let second = run(&small_policy(), &[]).expect("valid policy");
    assert_eq!(first, second);
    assert!(first.digest.starts_with("sha256:"));
    assert_eq!(first.stop, DriverStop::BudgetExhausted);
    assert!(first.evaluations >= 300);
    assert!(first.best_program.is_some());
    assert!(first.history.windows(2).all(|w| w[1].reward > w[0].reward));
}

#[test]
fn latent_cebs_runs_are_deterministic() {
    let policy = latent_cebs_policy();
    let first = run(&policy, &[]).expect("valid policy");
    let second = run(&policy, &[]).expect("valid policy");
    assert_eq!(first.digest, second.digest);
    assert_eq!(first.method, "cebs");
    assert_eq!(first.space, "latent");
}

#[test]
fn policy_seed_changes_the_policy_digest() {
    let a = small_policy();
    let b = PolicyConfig {
        seed: 1,
        ..small_policy()
    };
    assert_ne!(a.snapshot_hash(), b.snapshot_hash());
    assert_eq!(a.snapshot_hash(), small_policy().snapshot_hash());
}

// ACCEPTANCE: a solving seed program ends the run at the success threshold
#[test]
fn solving_seed_program_stops_at_the_success_threshold() {
    let solver = encode(&karel_program(TRAIL_SOLVER));
    let record = run(&small_policy(), &[solver.clone()]).expect("valid policy");
    assert_eq!(record.stop, DriverStop::SuccessThreshold);
    assert_eq!(record.searches, 1);
    assert_eq!(record.evaluations, 1);
    assert_eq!(record.best_program.as_deref(), Some(solver.as_str()));
    assert!(record.best_reward.is_some_and(|r| r >= 1.0));
    assert_eq!(record.history.len(), 1);
    assert_eq!(record.history[0].evaluations, 1);
}

#[test]
fn malformed_seed_program_is_reported_with_its_index() {
    let good = encode(&karel_program("DEF run m( move m)"));
    let result = run(&small_policy(), &[good, "DEF run m( fly m)".into()]);
    assert!(matches!(result, Err(RunError::SeedProgram { index: 1, .. })));
}

#[test]
fn run_record_survives_a_directory_round_trip() {
    let record = run(&small_policy(), &[]).expect("valid policy");
    let dir = tempfile::tempdir().expect("tempdir");
    record.write_to_dir(dir.path()).expect("write");
    let back = RunRecord::read_from_dir(dir.path()).expect("read");
    assert_eq!(back, record);
    assert_eq!(back.compute_digest(), record.digest);
}

// ---------------------------------------------------------------------------
// Cross-process
// ---------------------------------------------------------------------------

fn binary_path() -> String {
    let mut path = std::env::current_exe()
        .expect("can resolve test binary path")
        .parent()
        .expect("binary dir exists")
        .parent()
        .expect("deps parent exists")
        .to_path_buf();
    path.push("search_fixture");
    path.to_string_lossy().to_string()
}

fn workspace_root() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("tests/ exists")
        .parent()
        .expect("workspace root exists")
        .to_string_lossy()
        .to_string()
}

fn run_variant(work_dir: &str, args: &[&str], env_overrides: &[(&str, &str)]) -> String {
    let bin = binary_path();

    let mut command = Command::new(&bin);
    command.current_dir(work_dir).args(args);

    command
        .env_remove("LC_ALL")
        .env_remove("LC_COLLATE")
        .env_remove("LANG")
        .env_remove("LANGUAGE");

    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command.output().unwrap_or_else(|e| {
        panic!("failed to spawn {bin} (work_dir={work_dir}, overrides={env_overrides:?}): {e}")
    });

    assert!(
        output.status.success(),
        "search_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8(output.stdout).expect("stdout is valid UTF-8")
}

// ACCEPTANCE: cross-process determinism
#[test]
fn crossproc_determinism_four_env_variants() {
    let root = workspace_root();
    let baseline = run_variant(&root, &[], &[]);

    assert!(
        baseline.contains("record_digest=sha256:"),
        "baseline output missing record_digest"
    );
    assert!(
        baseline.contains("policy_digest=sha256:"),
        "baseline output missing policy_digest"
    );
    assert!(
        baseline.contains("stop=BudgetExhausted"),
        "baseline output missing stop=BudgetExhausted"
    );

    // In-process and cross-process digests agree.
    let in_process = run(&small_policy(), &[]).expect("valid policy");
    assert!(baseline.contains(&format!("record_digest={}\n", in_process.digest)));

    let alt_cwd = if cfg!(target_os = "windows") {
        "C:\\"
    } else {
        "/tmp"
    };
    let variant_cwd = run_variant(alt_cwd, &[], &[]);
    assert_eq!(
        baseline, variant_cwd,
        "output differs when cwd changes from {root} to {alt_cwd}"
    );

    let variant_locale = run_variant(&root, &[], &[("LC_ALL", "C"), ("LANG", "C")]);
    assert_eq!(baseline, variant_locale, "output differs when LC_ALL=C LANG=C");

    let variant_noise = run_variant(
        &root,
        &[],
        &[
            ("GRIDSYNTH_NOISE", "should_not_matter"),
            ("TZ", "America/New_York"),
            ("HOME", "/nonexistent"),
            ("RUST_LOG", "debug"),
        ],
    );
    assert_eq!(baseline, variant_noise, "output differs with spurious env vars");
}

#[test]
fn crossproc_policy_file_matches_in_process_run() {
    let policy = latent_cebs_policy();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("policy.json");
    std::fs::write(&path, serde_json::to_vec(&policy).expect("serialize")).expect("write");
    let path = path.to_string_lossy().to_string();

    let root = workspace_root();
    let first = run_variant(&root, &[&path], &[]);
    let second = run_variant("/tmp", &[&path], &[("TZ", "Asia/Tokyo")]);
    assert_eq!(first, second);

    let record = run(&policy, &[]).expect("valid policy");
    assert!(first.contains(&format!("record_digest={}\n", record.digest)));
    assert!(first.contains(&format!("policy_digest={}\n", policy.snapshot_hash())));
}
