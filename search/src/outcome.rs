//! Search outcome types and the search-method contract.

use serde::{Deserialize, Serialize};

use gridsynth_kernel::dsl::Ast;

use crate::contract::RewardFn;
use crate::space::SearchSpace;

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The best reward reached the success threshold.
    SuccessThreshold,
    /// No neighbor improved on the current program.
    LocalMaximum,
    /// The elite mean did not improve between rounds.
    EliteMeanStalled,
    /// The round limit was hit.
    IterationsExhausted,
    /// The space produced no neighbors at all.
    NoNeighbors,
}

/// Improvement history of one search.
///
/// `programs[i]` scored `rewards[i]`; rewards are non-decreasing and the
/// last entry is the best program found.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub programs: Vec<Ast>,
    pub rewards: Vec<f64>,
    pub termination: TerminationReason,
    /// Reward evaluations spent by this search.
    pub evaluations: u64,
}

impl SearchOutcome {
    #[must_use]
    pub fn best_program(&self) -> Option<&Ast> {
        self.programs.last()
    }

    #[must_use]
    pub fn best_reward(&self) -> f64 {
        self.rewards.last().copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// Number of history entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub(crate) fn push(&mut self, program: Ast, reward: f64) {
        self.programs.push(program);
        self.rewards.push(reward);
    }
}

/// A local search over some [`SearchSpace`].
pub trait SearchMethod<S: SearchSpace + ?Sized> {
    /// Short name used in logs and run records.
    fn name(&self) -> &'static str;

    /// Search for at most `iterations` rounds, starting from `seed` when it
    /// can be encoded and from a random individual otherwise.
    fn search(
        &mut self,
        space: &mut S,
        reward: &mut dyn RewardFn,
        iterations: usize,
        seed: Option<&Ast>,
    ) -> SearchOutcome;
}
