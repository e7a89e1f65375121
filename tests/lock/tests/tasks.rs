//! Karel task lock tests: reward shaping through the episode runner.

use gridsynth_harness::contract::TaskWorld;
use gridsynth_harness::runner::EpisodeRunner;
use gridsynth_harness::worlds::karel::KarelConfig;
use gridsynth_harness::worlds::{KarelTask, TaskKind};
use gridsynth_kernel::exec::StepKind;
use gridsynth_search::{RewardFn, Task, TaskSetReward};
use lock_tests::fixtures::karel_program;

fn config(rows: usize, cols: usize) -> KarelConfig {
    KarelConfig {
        rows,
        cols,
        crashable: false,
        leaps_behaviour: true,
        ..KarelConfig::default()
    }
}

fn task_set(kind: TaskKind, rows: usize, cols: usize, n: u64) -> TaskSetReward<EpisodeRunner<KarelTask>> {
    let tasks = (0..n)
        .map(|seed| {
            EpisodeRunner::new(kind.instance(&config(rows, cols), seed, -1.0), seed as usize)
        })
        .collect();
    TaskSetReward::new(tasks).expect("non-empty")
}

#[test]
fn path_follow_pays_per_marker_then_penalizes_putting_it_back() {
    let program = karel_program("DEF run m( pickMarker putMarker move m)");
    let mut reward = task_set(TaskKind::PathFollow, 8, 8, 8);
    // 11 trail markers on an 8x8 map; the put ends the episode before the move.
    let mean = reward.reward(&program);
    assert!((mean - (1.0 / 11.0 - 1.0)).abs() < 1e-12, "mean reward {mean}");
}

#[test]
fn path_follow_penalizes_dropping_markers() {
    let program = karel_program("DEF run m( putMarker m)");
    let mut reward = task_set(TaskKind::PathFollow, 8, 8, 4);
    assert!((reward.reward(&program) + 1.0).abs() < 1e-12);
}

#[test]
fn wall_avoider_rewards_inner_markers_only() {
    let mut reward = task_set(TaskKind::WallAvoider, 8, 5, 16);
    let put = karel_program("DEF run m( putMarker m)");
    // Every start cell of an 8x5 room is either inner (+1/4) or off-limits (-1).
    let mean = reward.reward(&put);
    let inner = reward
        .tasks()
        .iter()
        .filter(|t| {
            let (r, c, _) = t.task().initial_environment().agent();
            (2..=5).contains(&r) && c == 2
        })
        .count();
    #[allow(clippy::cast_precision_loss)]
    let expected = (inner as f64 * 0.25 - (16 - inner) as f64) / 16.0;
    assert!((mean - expected).abs() < 1e-12, "{mean} vs {expected}");
}

#[test]
fn record_mode_begins_with_the_full_state() {
    let program = karel_program("DEF run m( WHILE c( markersPresent c) w( pickMarker w) m)");
    let mut reward = task_set(TaskKind::PathFollow, 8, 8, 2);
    let (mean, logs) = reward.record(&program);
    assert_eq!(logs.len(), 2);
    for log in &logs {
        assert!(log.initial_state.starts_with("Wall(0, 0) ;\tWall(0, 1) ;"));
        assert_eq!(log.initial_state.lines().count(), 8);
        assert_eq!(log.steps[0].kind, StepKind::Perception);
        assert_eq!(log.steps[1].kind, StepKind::Action);
        assert!(log.steps[1].state.contains("Agent(6, 1, direction=(0, -1))"));
    }
    assert!((mean - 1.0 / 11.0).abs() < 1e-12);
    assert_eq!(reward.tasks()[0].task_id(), "path_follow-0");
}
