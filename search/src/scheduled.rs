//! Hill climbing with a scheduled neighborhood size.
//!
//! Acceptance is identical to [`crate::hill_climbing::HillClimbing`]. At the
//! start of every call, `k` is recomputed from the reward function's count of
//! programs evaluated so far, so a restart driver sees the neighborhood widen
//! (or narrow) as its budget is spent.

use tracing::debug;

use gridsynth_kernel::dsl::Ast;

use crate::contract::RewardFn;
use crate::hill_climbing::climb;
use crate::outcome::{SearchMethod, SearchOutcome};
use crate::policy::ScheduledConfig;
use crate::schedule::KSchedule;
use crate::space::{initial_candidate, SearchSpace};

#[derive(Debug, Clone)]
pub struct ScheduledHillClimbing {
    config: ScheduledConfig,
    schedule: KSchedule,
    current_k: usize,
}

impl ScheduledHillClimbing {
    #[must_use]
    pub fn new(config: ScheduledConfig) -> Self {
        let schedule = KSchedule::new(config.schedule.clone());
        let current_k = schedule.k_at(0);
        Self {
            config,
            schedule,
            current_k,
        }
    }

    /// `k` used by the most recent call.
    #[must_use]
    pub fn current_k(&self) -> usize {
        self.current_k
    }

    #[must_use]
    pub fn schedule(&self) -> &KSchedule {
        &self.schedule
    }
}

impl<S: SearchSpace + ?Sized> SearchMethod<S> for ScheduledHillClimbing {
    fn name(&self) -> &'static str {
        "scheduled_hill_climbing"
    }

    fn search(
        &mut self,
        space: &mut S,
        reward: &mut dyn RewardFn,
        iterations: usize,
        seed: Option<&Ast>,
    ) -> SearchOutcome {
        let programs = reward.programs_evaluated();
        self.current_k = self.schedule.k_at(programs);
        debug!(programs, k = self.current_k, "scheduled neighborhood size");
        let start = initial_candidate(space, seed, self.config.seed_encode_retries);
        climb(
            space,
            reward,
            start,
            self.current_k,
            iterations,
            self.config.success_threshold,
        )
    }
}
