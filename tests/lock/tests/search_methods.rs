//! Search-method lock tests: hill climbing, the k schedule and CEBS.

use gridsynth_kernel::dsl::{Ast, Vocabulary};
use gridsynth_search::policy::{
    CebsConfig, HillClimbingConfig, InterpolationType, KScheduleConfig, RatioType, SchedulerType,
};
use gridsynth_search::schedule::KSchedule;
use gridsynth_search::space::{LatentSpaceConfig, ProgrammaticSpaceConfig};
use gridsynth_search::{
    Cebs, FnReward, HillClimbing, LatentSpace, ProgrammaticSpace, RewardFn, SearchMethod,
    TerminationReason,
};

// ACCEPTANCE: constant reward ends hill climbing after one round
#[test]
fn hill_climbing_on_a_flat_surface_stops_after_one_round() {
    let k = 32;
    for (seed, latent) in [(0, false), (1, true)] {
        let mut reward = FnReward::new(|_: &Ast| 0.25);
        let mut method = HillClimbing::new(HillClimbingConfig {
            k,
            ..HillClimbingConfig::default()
        });
        let outcome = if latent {
            let mut space =
                LatentSpace::new(Vocabulary::karel(), LatentSpaceConfig::default(), seed);
            method.search(&mut space, &mut reward, 100, None)
        } else {
            let mut space =
                ProgrammaticSpace::new(Vocabulary::karel(), ProgrammaticSpaceConfig::default(), seed);
            method.search(&mut space, &mut reward, 100, None)
        };
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.termination, TerminationReason::LocalMaximum);
        assert_eq!(outcome.evaluations, 1 + k as u64);
        assert_eq!(reward.programs_evaluated(), 1 + k as u64);
    }
}

#[test]
fn hill_climbing_history_is_strictly_increasing() {
    let mut space =
        ProgrammaticSpace::new(Vocabulary::karel(), ProgrammaticSpaceConfig::default(), 5);
    #[allow(clippy::cast_precision_loss)]
    let mut reward = FnReward::new(|ast: &Ast| ast.size() as f64 / 100.0);
    let outcome = HillClimbing::new(HillClimbingConfig {
        k: 8,
        ..HillClimbingConfig::default()
    })
    .search(&mut space, &mut reward, 50, None);
    assert!(outcome.rewards.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(outcome.programs.len(), outcome.rewards.len());
}

// ACCEPTANCE: scheduled k interpolation
#[test]
fn k_schedule_runs_from_start_to_end_monotonically() {
    let schedule = KSchedule::new(KScheduleConfig {
        start_k: 16,
        end_k: 1024,
        max_programs: 1_000_000,
        ratio: RatioType::Linear,
        scheduler: SchedulerType::Linear,
        interpolation: InterpolationType::Log,
    });
    assert_eq!(schedule.k_at(0), 16);
    assert_eq!(schedule.k_at(1_000_000), 1024);
    let mut previous = 16;
    for p in (0..=1_000_000).step_by(10_007) {
        let k = schedule.k_at(p);
        assert!(k >= previous, "k({p}) = {k} dropped below {previous}");
        assert!((16..=1024).contains(&k));
        previous = k;
    }
}

// ACCEPTANCE: CEBS stops once the elite mean drops and keeps the overall best
#[test]
fn cebs_halts_when_the_elite_mean_drops() {
    // Evaluation order: start, then batches of k = 4.
    let table = [
        0.0, // start
        0.1, 0.2, 0.3, 0.4, // round 1: elite mean 0.35
        0.2, 0.8, 0.3, 0.1, // round 2: elite mean 0.55, overall best 0.8
        0.5, 0.1, 0.0, 0.0, // round 3: elite mean 0.30, drops
        0.9, 0.9, 0.9, 0.9, // never reached
    ];
    let mut seen: Vec<Ast> = Vec::new();
    let mut space = LatentSpace::new(
        Vocabulary::karel(),
        LatentSpaceConfig {
            dimension: 24,
            ..LatentSpaceConfig::default()
        },
        17,
    );
    let outcome = {
        let mut reward = FnReward::new(|ast: &Ast| {
            seen.push(ast.clone());
            table.get(seen.len() - 1).copied().unwrap_or(0.0)
        });
        Cebs::new(CebsConfig {
            k: 4,
            e: 2,
            ..CebsConfig::default()
        })
        .search(&mut space, &mut reward, 100, None)
    };
    assert_eq!(outcome.termination, TerminationReason::EliteMeanStalled);
    assert_eq!(outcome.evaluations, 13);
    assert!((outcome.best_reward() - 0.8).abs() < 1e-12);
    assert_eq!(outcome.best_program(), Some(&seen[6]));
}
