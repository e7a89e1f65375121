//! Execution lock tests: suspension points, crash handling, record order.

use gridsynth_harness::worlds::karel::{Direction, KarelConfig, KarelWorld};
use gridsynth_kernel::env::Environment;
use gridsynth_kernel::exec::{ExecEvent, ExecError, Execution};
use lock_tests::fixtures::{karel_program, world};

const CORRIDOR: &str = "\
******
*>...*
******";

// ACCEPTANCE: Repeat(3, move) suspends exactly three times
#[test]
fn repeat_three_moves_suspends_three_times() {
    let program = karel_program("DEF run m( REPEAT R=3 r( move r) m)");
    let mut env = world(CORRIDOR, true, false);
    let mut exec = Execution::new(&program, &mut env).expect("complete program");
    let mut columns = Vec::new();
    while let Some(step) = exec.next_action() {
        assert_eq!(step.name, "move");
        columns.push(exec.env().agent().1);
    }
    assert_eq!(columns, vec![2, 3, 4]);
    assert!(!env.is_crashed());
}

#[test]
fn blocked_moves_with_leaps_turn_around_at_every_suspension() {
    let program = karel_program("DEF run m( REPEAT R=3 r( move r) m)");
    let mut env = world("***\n*^*\n***", false, true);
    let facings: Vec<Direction> = {
        let mut exec = Execution::new(&program, &mut env).expect("complete program");
        let mut facings = Vec::new();
        while exec.next_action().is_some() {
            facings.push(exec.env().agent().2);
        }
        facings
    };
    assert_eq!(facings, vec![Direction::South, Direction::North, Direction::South]);
    assert!(!env.is_crashed());
    assert_eq!(env.agent().0, 1);
}

#[test]
fn crash_ends_the_run_after_the_crashing_action() {
    let program = karel_program("DEF run m( REPEAT R=9 r( move r) m)");
    let mut env = world(CORRIDOR, true, false);
    let steps = Execution::new(&program, &mut env).expect("complete program").count();
    // Three moves reach the wall, the fourth crashes.
    assert_eq!(steps, 4);
    assert!(env.is_crashed());
}

#[test]
fn call_budget_stops_unbounded_loops() {
    let program = karel_program("DEF run m( WHILE c( frontIsClear c) w( turnLeft w) m)");
    let config = KarelConfig {
        rows: 3,
        cols: 3,
        crashable: false,
        max_calls: 100,
        ..KarelConfig::default()
    };
    let mut env = KarelWorld::new(&config);
    env.place_agent(1, 1, Direction::North);
    let steps = Execution::new(&program, &mut env).expect("complete program").count();
    assert!(env.is_crashed());
    assert!(steps <= 50);
    assert!(env.calls() > 100);
}

#[test]
fn record_mode_reports_perceptions_before_the_actions_they_guard() {
    let program =
        karel_program("DEF run m( IFELSE c( not c( frontIsClear c) c) i( turnLeft i) ELSE e( move e) m)");
    let mut env = world(CORRIDOR, true, false);
    let mut exec = Execution::recording(&program, &mut env).expect("complete program");
    let first = exec.next_event();
    let second = exec.next_event();
    assert!(matches!(
        first,
        Some(ExecEvent::Perception(p)) if p.name == "frontIsClear" && p.result
    ));
    assert!(matches!(second, Some(ExecEvent::Action(a)) if a.name == "move"));
    assert!(exec.next_event().is_none());
}

#[test]
fn incomplete_programs_are_refused() {
    use gridsynth_kernel::dsl::{AstBuilder, HoleKind};
    let mut b = AstBuilder::new();
    let hole = b.hole(HoleKind::Statement);
    let program = b.program(hole);
    let mut env = world(CORRIDOR, true, false);
    assert!(matches!(
        Execution::new(&program, &mut env),
        Err(ExecError::IncompleteProgram { .. })
    ));
}
