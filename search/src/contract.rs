//! Contracts between search and the task layer.
//!
//! A [`Task`] owns one environment instance and turns a rollout into a
//! scalar reward. A [`RewardFn`] is what search algorithms consume; the
//! canonical one, [`TaskSetReward`], averages `evaluate_program` over a
//! fixed list of task instances and counts evaluated programs (the input of
//! the scheduled-`k` policy).

use gridsynth_kernel::dsl::Ast;
use gridsynth_kernel::exec::{NodeCredit, TraceLog};

use crate::error::SearchError;

/// A task instance: canonical initial environment plus reward function.
pub trait Task {
    /// Stable identifier used in logs and run records.
    fn task_id(&self) -> &str;

    /// Reset per-episode reward bookkeeping.
    fn reset(&mut self);

    /// Run `program` on a fresh clone of the initial environment.
    fn evaluate_program(&mut self, program: &Ast) -> f64;

    /// Like [`Task::evaluate_program`], also returning the step-by-step trace.
    fn record_evaluate_program(&mut self, program: &Ast) -> (f64, TraceLog);

    /// Like [`Task::evaluate_program`], also returning per-node credit.
    fn evaluate_and_assign_credit(&mut self, program: &Ast) -> (f64, NodeCredit);
}

/// Scalar objective maximized by every search method.
pub trait RewardFn {
    fn reward(&mut self, program: &Ast) -> f64;

    /// Programs evaluated through this function so far.
    fn programs_evaluated(&self) -> u64;
}

impl<R: RewardFn + ?Sized> RewardFn for &mut R {
    fn reward(&mut self, program: &Ast) -> f64 {
        (**self).reward(program)
    }

    fn programs_evaluated(&self) -> u64 {
        (**self).programs_evaluated()
    }
}

/// Mean of `evaluate_program` over a fixed, ordered list of task instances.
#[derive(Debug)]
pub struct TaskSetReward<T> {
    tasks: Vec<T>,
    evaluated: u64,
}

impl<T: Task> TaskSetReward<T> {
    /// # Errors
    ///
    /// Returns [`SearchError::EmptyTaskSet`] if `tasks` is empty.
    pub fn new(tasks: Vec<T>) -> Result<Self, SearchError> {
        if tasks.is_empty() {
            return Err(SearchError::EmptyTaskSet);
        }
        Ok(Self {
            tasks,
            evaluated: 0,
        })
    }

    #[must_use]
    pub fn tasks(&self) -> &[T] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [T] {
        &mut self.tasks
    }

    /// Mean reward and per-task trace logs, in task order.
    pub fn record(&mut self, program: &Ast) -> (f64, Vec<TraceLog>) {
        self.evaluated += 1;
        let (rewards, logs): (Vec<f64>, Vec<TraceLog>) = self
            .tasks
            .iter_mut()
            .map(|t| t.record_evaluate_program(program))
            .unzip();
        (mean(&rewards), logs)
    }
}

impl<T: Task> RewardFn for TaskSetReward<T> {
    fn reward(&mut self, program: &Ast) -> f64 {
        self.evaluated += 1;
        let rewards: Vec<f64> = self
            .tasks
            .iter_mut()
            .map(|t| t.evaluate_program(program))
            .collect();
        mean(&rewards)
    }

    fn programs_evaluated(&self) -> u64 {
        self.evaluated
    }
}

/// Adapter turning a closure into a counting [`RewardFn`].
pub struct FnReward<F> {
    f: F,
    evaluated: u64,
}

impl<F: FnMut(&Ast) -> f64> FnReward<F> {
    pub fn new(f: F) -> Self {
        Self { f, evaluated: 0 }
    }
}

impl<F: FnMut(&Ast) -> f64> RewardFn for FnReward<F> {
    fn reward(&mut self, program: &Ast) -> f64 {
        self.evaluated += 1;
        (self.f)(program)
    }

    fn programs_evaluated(&self) -> u64 {
        self.evaluated
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
