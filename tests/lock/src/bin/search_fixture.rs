//! Binary that runs one synthesis run and prints deterministic output lines
//! for cross-process verification.
//!
//! Usage: `search_fixture [policy.json]`
//!
//! Without an argument the built-in small path-following run is used.
//! Logging goes to stderr and is controlled by `RUST_LOG`.
//!
//! Output: key=value lines (see source for format).

use gridsynth_harness::policy::PolicyConfig;
use gridsynth_harness::runner::run;
use lock_tests::fixtures::small_policy;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let policy: PolicyConfig = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
            serde_json::from_str(&text).unwrap_or_else(|e| panic!("invalid policy {path}: {e}"))
        }
        None => small_policy(),
    };

    let record = run(&policy, &[]).expect("run failed");

    println!("record_digest={}", record.digest);
    println!("policy_digest={}", policy.snapshot_hash());
    println!("best_program={}", record.best_program.as_deref().unwrap_or(""));
    println!(
        "best_reward={}",
        record.best_reward.map_or_else(String::new, |r| format!("{r:.6}"))
    );
    println!("evaluations={}", record.evaluations);
    println!("searches={}", record.searches);
    println!("history_len={}", record.history.len());
    println!("stop={:?}", record.stop);
}
