//! Credit-assignment lock tests.

use gridsynth_harness::contract::{StepReward, TaskWorld};
use gridsynth_harness::runner::EpisodeRunner;
use gridsynth_harness::worlds::karel::KarelWorld;
use gridsynth_kernel::dsl::{Ast, NodeId, NodeKind};
use gridsynth_kernel::exec::{Execution, NodeCredit};
use gridsynth_search::Task;
use lock_tests::fixtures::{karel_program, world};

/// Pays out a fixed reward sequence, one entry per action.
#[derive(Debug, Clone)]
struct Scripted {
    world: KarelWorld,
    rewards: Vec<f64>,
    step: usize,
}

impl TaskWorld for Scripted {
    type Env = KarelWorld;

    fn name(&self) -> &str {
        "scripted"
    }

    fn initial_environment(&self) -> &KarelWorld {
        &self.world
    }

    fn reset_episode(&mut self) {
        self.step = 0;
    }

    fn step_reward(&mut self, _env: &KarelWorld) -> StepReward {
        let reward = self.rewards.get(self.step).copied().unwrap_or(0.0);
        self.step += 1;
        StepReward::proceed(reward)
    }

    fn crash_penalty(&self) -> f64 {
        -1.0
    }

    fn describe(&self, env: &KarelWorld) -> String {
        env.full_state()
    }
}

fn concatenate(ast: &Ast) -> NodeId {
    ast.all_nodes()
        .find(|&id| *ast.kind(id) == NodeKind::Concatenate)
        .expect("program has a Concatenate")
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

// ACCEPTANCE: Concatenate(A, B) with rewards [0.5, -0.2] scores 0.3 over 2 steps
#[test]
fn concatenate_accumulates_both_children() {
    let program = karel_program("DEF run m( turnLeft turnRight m)");
    let mut env = world("...\n.^.\n...", false, false);
    let actions: Vec<NodeId> = Execution::new(&program, &mut env)
        .expect("complete program")
        .map(|step| step.node)
        .collect();
    assert_eq!(actions.len(), 2);

    let credit = NodeCredit::from_steps(&program, actions.iter().copied().zip([0.5, -0.2]));
    let concat = concatenate(&program);
    assert!(close(credit.score(concat), 0.3));
    assert_eq!(credit.count(concat), 2);
    assert!(close(credit.score(actions[0]), 0.5));
    assert!(close(credit.score(actions[1]), -0.2));
    assert_eq!(credit.count(program.root()), 0);
}

#[test]
fn task_credit_mode_matches_the_scripted_rewards() {
    let program = karel_program("DEF run m( turnLeft turnRight m)");
    let task = Scripted {
        world: world("...\n.^.\n...", false, false),
        rewards: vec![0.5, -0.2],
        step: 0,
    };
    let mut runner = EpisodeRunner::new(task, 0);
    let (total, credit) = runner.evaluate_and_assign_credit(&program);
    assert!(close(total, 0.3));
    assert!(close(credit.score(concatenate(&program)), 0.3));
    assert_eq!(credit.count(concatenate(&program)), 2);
    assert!(close(runner.evaluate_program(&program), 0.3));
}

#[test]
fn loop_bodies_are_credited_once_per_iteration() {
    let program = karel_program("DEF run m( REPEAT R=4 r( turnLeft r) m)");
    let task = Scripted {
        world: world(".^.", false, false),
        rewards: vec![0.25; 4],
        step: 0,
    };
    let mut runner = EpisodeRunner::new(task, 0);
    let (total, credit) = runner.evaluate_and_assign_credit(&program);
    assert!(close(total, 1.0));
    let repeat = program
        .all_nodes()
        .find(|&id| *program.kind(id) == NodeKind::Repeat)
        .expect("repeat");
    assert_eq!(credit.count(repeat), 4);
    assert!(close(credit.share(repeat), 1.0));
}

#[test]
fn find_path_gives_child_positions_from_the_root() {
    let program = karel_program("DEF run m( turnLeft turnRight m)");
    let concat = concatenate(&program);
    let second = program.children(concat)[1];
    let path = program.find_path(second);
    assert_eq!(path, vec![0, 1]);
    assert_eq!(program.node_at_path(&path), Some(second));
    assert!(program.find_path(program.root()).is_empty());
}
