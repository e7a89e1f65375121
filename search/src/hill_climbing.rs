//! First-improvement hill climbing.
//!
//! Each round asks the space for `k` neighbors of the current candidate and
//! evaluates them left to right. The first neighbor whose reward strictly
//! exceeds the current reward is accepted and the round ends; if none does,
//! the current candidate is a local maximum. The history gains one entry per
//! accepted improvement, so its length is the number of improving rounds
//! plus one.

use tracing::{debug, info, trace};

use gridsynth_kernel::dsl::Ast;

use crate::contract::RewardFn;
use crate::outcome::{SearchMethod, SearchOutcome, TerminationReason};
use crate::policy::HillClimbingConfig;
use crate::space::{initial_candidate, Candidate, SearchSpace};

/// Hill climbing with a fixed neighborhood size.
#[derive(Debug, Clone, Default)]
pub struct HillClimbing {
    config: HillClimbingConfig,
}

impl HillClimbing {
    #[must_use]
    pub fn new(config: HillClimbingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &HillClimbingConfig {
        &self.config
    }
}

impl<S: SearchSpace + ?Sized> SearchMethod<S> for HillClimbing {
    fn name(&self) -> &'static str {
        "hill_climbing"
    }

    fn search(
        &mut self,
        space: &mut S,
        reward: &mut dyn RewardFn,
        iterations: usize,
        seed: Option<&Ast>,
    ) -> SearchOutcome {
        let start = initial_candidate(space, seed, self.config.seed_encode_retries);
        climb(
            space,
            reward,
            start,
            self.config.k,
            iterations,
            self.config.success_threshold,
        )
    }
}

/// The hill-climbing loop from `start` with neighborhood size `k`.
pub(crate) fn climb<S: SearchSpace + ?Sized>(
    space: &mut S,
    reward: &mut dyn RewardFn,
    start: Candidate<S::Repr>,
    k: usize,
    iterations: usize,
    success_threshold: f64,
) -> SearchOutcome {
    let evaluated_before = reward.programs_evaluated();
    let mut best_reward = reward.reward(&start.program);
    let mut best = start;
    let mut outcome = SearchOutcome {
        programs: vec![best.program.clone()],
        rewards: vec![best_reward],
        termination: TerminationReason::IterationsExhausted,
        evaluations: 0,
    };

    for round in 0..iterations {
        if best_reward >= success_threshold {
            outcome.termination = TerminationReason::SuccessThreshold;
            break;
        }
        let neighbors = space.neighbors(&best.repr, k);
        if neighbors.is_empty() {
            outcome.termination = TerminationReason::NoNeighbors;
            break;
        }
        let mut improved = false;
        for (index, candidate) in neighbors.into_iter().enumerate() {
            let r = reward.reward(&candidate.program);
            trace!(round, index, reward = r, "neighbor evaluated");
            if r > best_reward {
                debug!(round, index, from = best_reward, to = r, "improvement accepted");
                best_reward = r;
                best = candidate;
                improved = true;
                break;
            }
        }
        if !improved {
            outcome.termination = TerminationReason::LocalMaximum;
            break;
        }
        outcome.push(best.program.clone(), best_reward);
    }

    // The final improvement may reach the threshold on the last round.
    if outcome.termination == TerminationReason::IterationsExhausted
        && best_reward >= success_threshold
    {
        outcome.termination = TerminationReason::SuccessThreshold;
    }
    outcome.evaluations = reward.programs_evaluated() - evaluated_before;
    info!(
        termination = ?outcome.termination,
        best_reward,
        history = outcome.len(),
        evaluations = outcome.evaluations,
        "hill climbing finished"
    );
    outcome
}
