//! Budgeted restart loop.
//!
//! Runs one search after another until the reward function has evaluated
//! `budget` programs or a search reaches the success threshold. Externally
//! supplied seed programs start the first searches, one per restart; once
//! they are used up every search starts from a random individual. Every
//! evaluation that beats the best reward so far is recorded, keyed by the
//! evaluation count at which it happened.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gridsynth_kernel::dsl::{encode, Ast, Vocabulary};

use crate::contract::RewardFn;
use crate::error::SearchError;
use crate::outcome::SearchMethod;
use crate::policy::{DEFAULT_MAX_PROGRAMS, DEFAULT_SUCCESS_THRESHOLD};
use crate::space::SearchSpace;

/// Round limit handed to each search.
pub const DEFAULT_ITERATIONS_PER_SEARCH: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Total programs the run may evaluate before no new search starts.
    pub budget: u64,
    pub iterations_per_search: usize,
    pub success_threshold: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_MAX_PROGRAMS,
            iterations_per_search: DEFAULT_ITERATIONS_PER_SEARCH,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
        }
    }
}

impl DriverConfig {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] for a zero budget or a NaN threshold.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.budget == 0 {
            return Err(SearchError::InvalidConfig {
                detail: "budget must be positive".into(),
            });
        }
        if self.success_threshold.is_nan() {
            return Err(SearchError::InvalidConfig {
                detail: "success_threshold must be a number".into(),
            });
        }
        Ok(())
    }
}

/// A new best reward, observed after `evaluations` programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub evaluations: u64,
    pub reward: f64,
    pub program: String,
}

/// Why the restart loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStop {
    SuccessThreshold,
    BudgetExhausted,
}

/// Result of a budgeted run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub best_program: Option<Ast>,
    pub best_reward: f64,
    pub history: Vec<HistoryPoint>,
    pub evaluations: u64,
    pub searches: usize,
    pub stop: DriverStop,
}

/// [`RewardFn`] wrapper that records every new best.
pub struct BestTracker<'r> {
    inner: &'r mut dyn RewardFn,
    best_reward: f64,
    best_program: Option<Ast>,
    history: Vec<HistoryPoint>,
}

impl<'r> BestTracker<'r> {
    pub fn new(inner: &'r mut dyn RewardFn) -> Self {
        Self {
            inner,
            best_reward: f64::NEG_INFINITY,
            best_program: None,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn best_reward(&self) -> f64 {
        self.best_reward
    }

    #[must_use]
    pub fn best_program(&self) -> Option<&Ast> {
        self.best_program.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryPoint] {
        &self.history
    }
}

impl RewardFn for BestTracker<'_> {
    fn reward(&mut self, program: &Ast) -> f64 {
        let r = self.inner.reward(program);
        if r > self.best_reward {
            self.best_reward = r;
            self.best_program = Some(program.clone());
            self.history.push(HistoryPoint {
                evaluations: self.inner.programs_evaluated(),
                reward: r,
                program: encode(program),
            });
            debug!(
                evaluations = self.inner.programs_evaluated(),
                reward = r,
                "new best program"
            );
        }
        r
    }

    fn programs_evaluated(&self) -> u64 {
        self.inner.programs_evaluated()
    }
}

/// Run searches until the budget is spent or a program reaches the success
/// threshold.
///
/// Seeds that are not valid programs of `vocab` are skipped with a warning.
///
/// # Errors
///
/// Returns [`SearchError::InvalidConfig`] if `config` fails validation.
pub fn run_restarts<S, M>(
    space: &mut S,
    method: &mut M,
    reward: &mut dyn RewardFn,
    vocab: &Vocabulary,
    config: &DriverConfig,
    seeds: &[Ast],
) -> Result<RunSummary, SearchError>
where
    S: SearchSpace + ?Sized,
    M: SearchMethod<S> + ?Sized,
{
    config.validate()?;
    let mut tracker = BestTracker::new(reward);
    let mut seeds = seeds.iter().filter(|seed| match seed.validate(vocab) {
        Ok(()) => true,
        Err(error) => {
            warn!(%error, program = %encode(seed), "skipping invalid seed program");
            false
        }
    });
    let mut searches = 0;
    let stop = loop {
        if tracker.best_reward() >= config.success_threshold {
            break DriverStop::SuccessThreshold;
        }
        if tracker.programs_evaluated() >= config.budget {
            break DriverStop::BudgetExhausted;
        }
        let seed = seeds.next();
        let outcome = method.search(space, &mut tracker, config.iterations_per_search, seed);
        searches += 1;
        debug!(
            search = searches,
            method = method.name(),
            seeded = seed.is_some(),
            termination = ?outcome.termination,
            reward = outcome.best_reward(),
            evaluations = tracker.programs_evaluated(),
            "search finished"
        );
    };

    let summary = RunSummary {
        best_program: tracker.best_program.take(),
        best_reward: tracker.best_reward,
        evaluations: tracker.programs_evaluated(),
        history: std::mem::take(&mut tracker.history),
        searches,
        stop,
    };
    info!(
        stop = ?summary.stop,
        best_reward = summary.best_reward,
        evaluations = summary.evaluations,
        searches,
        "run finished"
    );
    Ok(summary)
}
