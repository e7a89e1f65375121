//! Cross-entropy beam search.
//!
//! Each round evaluates the whole candidate batch, keeps the top `e` as the
//! elite set, and proposes the next batch as `k / e` neighbors per elite.
//! The search stops when the elite mean fails to improve on the previous
//! round, when the best reward reaches the success threshold, or when the
//! round limit is hit. The best program seen in any round is tracked
//! separately from the elites and is always the last history entry.

use tracing::{debug, info, trace};

use gridsynth_kernel::dsl::Ast;

use crate::contract::RewardFn;
use crate::outcome::{SearchMethod, SearchOutcome, TerminationReason};
use crate::policy::CebsConfig;
use crate::space::{initial_candidate, Candidate, SearchSpace};

#[derive(Debug, Clone, Default)]
pub struct Cebs {
    config: CebsConfig,
}

impl Cebs {
    #[must_use]
    pub fn new(config: CebsConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &CebsConfig {
        &self.config
    }
}

/// Indices of the `e` highest rewards; ties keep batch order.
fn top_indices(rewards: &[f64], e: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rewards.len()).collect();
    order.sort_by(|&a, &b| rewards[b].total_cmp(&rewards[a]));
    order.truncate(e);
    order
}

#[allow(clippy::cast_precision_loss)]
fn mean_of(rewards: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return f64::NEG_INFINITY;
    }
    indices.iter().map(|&i| rewards[i]).sum::<f64>() / indices.len() as f64
}

impl<S: SearchSpace + ?Sized> SearchMethod<S> for Cebs {
    fn name(&self) -> &'static str {
        "cebs"
    }

    fn search(
        &mut self,
        space: &mut S,
        reward: &mut dyn RewardFn,
        iterations: usize,
        seed: Option<&Ast>,
    ) -> SearchOutcome {
        let CebsConfig {
            k,
            e,
            success_threshold,
            seed_encode_retries,
        } = self.config;
        let e = e.max(1);
        let per_elite = (k / e).max(1);
        let evaluated_before = reward.programs_evaluated();

        let start = initial_candidate(space, seed, seed_encode_retries);
        let mut best_reward = reward.reward(&start.program);
        let mut best_program = start.program.clone();
        let mut outcome = SearchOutcome {
            programs: vec![best_program.clone()],
            rewards: vec![best_reward],
            termination: TerminationReason::IterationsExhausted,
            evaluations: 0,
        };
        let mut best_elite_mean = f64::NEG_INFINITY;
        let mut candidates: Vec<Candidate<S::Repr>> = space.neighbors(&start.repr, k);

        for round in 0..iterations {
            if best_reward >= success_threshold {
                outcome.termination = TerminationReason::SuccessThreshold;
                break;
            }
            if candidates.is_empty() {
                outcome.termination = TerminationReason::NoNeighbors;
                break;
            }
            let rewards: Vec<f64> = candidates
                .iter()
                .enumerate()
                .map(|(index, candidate)| {
                    let r = reward.reward(&candidate.program);
                    trace!(round, index, reward = r, "candidate evaluated");
                    r
                })
                .collect();
            for (candidate, &r) in candidates.iter().zip(&rewards) {
                if r > best_reward {
                    best_reward = r;
                    best_program = candidate.program.clone();
                }
            }

            let elites = top_indices(&rewards, e);
            let elite_mean = mean_of(&rewards, &elites);
            if elite_mean <= best_elite_mean {
                debug!(round, elite_mean, best_elite_mean, "elite mean stalled");
                if best_reward > outcome.best_reward() {
                    outcome.push(best_program.clone(), best_reward);
                }
                outcome.termination = TerminationReason::EliteMeanStalled;
                break;
            }
            debug!(round, elite_mean, best_reward, "elite mean improved");
            best_elite_mean = elite_mean;
            outcome.push(best_program.clone(), best_reward);
            if best_reward >= success_threshold {
                outcome.termination = TerminationReason::SuccessThreshold;
                break;
            }

            let mut next = Vec::with_capacity(per_elite * elites.len());
            for &i in &elites {
                next.extend(space.neighbors(&candidates[i].repr, per_elite));
            }
            candidates = next;
        }

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
            "cebs finished"
        );
        outcome
    }
}
