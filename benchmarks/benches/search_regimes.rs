use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use gridsynth_benchmarks::{regimes, task_reward, Regime};
use gridsynth_harness::runner::run;
use gridsynth_kernel::dsl::Vocabulary;
use gridsynth_search::policy::{MethodConfig, SpaceConfig};
use gridsynth_search::{
    Cebs, HillClimbing, LatentSpace, ProgrammaticSpace, RewardFn, ScheduledHillClimbing,
    SearchMethod, SearchOutcome, SearchSpace,
};

fn one_search<S: SearchSpace>(space: &mut S, regime: &Regime, reward: &mut dyn RewardFn) -> SearchOutcome {
    let iterations = regime.policy.driver_config().iterations_per_search;
    match &regime.policy.method {
        MethodConfig::HillClimbing(config) => {
            HillClimbing::new(config.clone()).search(space, reward, iterations, None)
        }
        MethodConfig::ScheduledHillClimbing(config) => {
            ScheduledHillClimbing::new(config.clone()).search(space, reward, iterations, None)
        }
        MethodConfig::Cebs(config) => Cebs::new(config.clone()).search(space, reward, iterations, None),
    }
}

// ---------------------------------------------------------------------------
// A single search from a random start (no restarts, no record)
// ---------------------------------------------------------------------------

fn bench_single_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_search");
    group.sample_size(20);

    for regime in regimes() {
        let policy = &regime.policy;
        group.bench_function(BenchmarkId::new(regime.name, ""), |b| {
            b.iter(|| {
                let mut reward = task_reward(policy);
                match &policy.space {
                    SpaceConfig::Programmatic(config) => {
                        let mut space =
                            ProgrammaticSpace::new(Vocabulary::karel(), config.clone(), policy.seed);
                        one_search(&mut space, &regime, &mut reward)
                    }
                    SpaceConfig::Latent(config) => {
                        let mut space =
                            LatentSpace::new(Vocabulary::karel(), config.clone(), policy.seed);
                        one_search(&mut space, &regime, &mut reward)
                    }
                }
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// End-to-end: run() with restarts and the run record
// ---------------------------------------------------------------------------

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");
    group.sample_size(10);

    for regime in regimes() {
        group.bench_function(BenchmarkId::new(regime.name, ""), |b| {
            b.iter(|| run(&regime.policy, &[]).expect("run"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_search, bench_full_run);
criterion_main!(benches);
