//! Shared helpers for gridsynth benchmark suites.

use gridsynth_harness::policy::PolicyConfig;
use gridsynth_harness::runner::EpisodeRunner;
use gridsynth_harness::worlds::{KarelTask, TaskKind};
use gridsynth_kernel::dsl::{decode, Ast, Vocabulary};
use gridsynth_search::policy::{
    CebsConfig, HillClimbingConfig, KScheduleConfig, MethodConfig, ScheduledConfig, SpaceConfig,
};
use gridsynth_search::space::LatentSpaceConfig;
use gridsynth_search::TaskSetReward;

/// A named run configuration exercised by the search benchmarks.
pub struct Regime {
    pub name: &'static str,
    pub policy: PolicyConfig,
}

fn regime(name: &'static str, task: TaskKind, method: MethodConfig, space: SpaceConfig) -> Regime {
    Regime {
        name,
        policy: PolicyConfig {
            task,
            num_envs: Some(8),
            budget: Some(2_000),
            method,
            space,
            ..PolicyConfig::default()
        },
    }
}

/// Every method on the task it is usually run on.
#[must_use]
pub fn regimes() -> Vec<Regime> {
    vec![
        regime(
            "hc_path_follow",
            TaskKind::PathFollow,
            MethodConfig::HillClimbing(HillClimbingConfig {
                k: 64,
                ..HillClimbingConfig::default()
            }),
            SpaceConfig::default(),
        ),
        regime(
            "shc_wall_avoider",
            TaskKind::WallAvoider,
            MethodConfig::ScheduledHillClimbing(ScheduledConfig {
                schedule: KScheduleConfig {
                    start_k: 16,
                    end_k: 256,
                    max_programs: 2_000,
                    ..KScheduleConfig::default()
                },
                ..ScheduledConfig::default()
            }),
            SpaceConfig::default(),
        ),
        regime(
            "cebs_latent_path_follow",
            TaskKind::PathFollow,
            MethodConfig::Cebs(CebsConfig {
                k: 32,
                e: 4,
                ..CebsConfig::default()
            }),
            SpaceConfig::Latent(LatentSpaceConfig::default()),
        ),
    ]
}

/// The reward function `policy` would search with.
///
/// # Panics
///
/// Panics if the policy yields no task instances. Benchmark setup failures are fatal.
#[must_use]
pub fn task_reward(policy: &PolicyConfig) -> TaskSetReward<EpisodeRunner<KarelTask>> {
    let tasks = policy
        .tasks()
        .into_iter()
        .enumerate()
        .map(|(index, task)| EpisodeRunner::new(task, index))
        .collect();
    TaskSetReward::new(tasks).expect("policy has task instances")
}

/// Karel programs of increasing size, from a single action to nested loops.
///
/// # Panics
///
/// Panics if a built-in program fails to decode.
#[must_use]
pub fn sample_programs() -> Vec<(&'static str, Ast)> {
    let vocab = Vocabulary::karel();
    [
        ("single", "DEF run m( move m)"),
        (
            "branching",
            "DEF run m( IFELSE c( frontIsClear c) i( move i) ELSE e( turnLeft e) putMarker m)",
        ),
        (
            "nested",
            "DEF run m( REPEAT R=5 r( WHILE c( markersPresent c) w( pickMarker \
             IF c( not c( frontIsClear c) c) i( turnRight i) move w) turnLeft r) m)",
        ),
    ]
    .into_iter()
    .map(|(name, text)| {
        let ast = decode(text, &vocab).unwrap_or_else(|e| panic!("benchmark program {name}: {e}"));
        (name, ast)
    })
    .collect()
}
