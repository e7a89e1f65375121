//! Harness runner: evaluates programs on task worlds and drives full runs.
//!
//! [`EpisodeRunner`] adapts a [`TaskWorld`] to the search crate's
//! [`Task`] contract. Every evaluation resets the task's bookkeeping, clones
//! the canonical initial environment and steps the program one action at a
//! time, stopping on termination or crash.
//!
//! # Pipeline
//!
//! ```text
//! PolicyConfig::validate() → decode seed programs → build task instances
//!   → TaskSetReward → search space + method → run_restarts()
//!   → RunRecord (policy snapshot + fingerprint)
//! ```

use tracing::{info, warn};

use gridsynth_kernel::dsl::{
    render_marked, Ast, Decoder, MalformedProgram, NodeId, RenderStyle, Vocabulary,
};
use gridsynth_kernel::env::Environment;
use gridsynth_kernel::exec::{ExecEvent, Execution, NodeCredit, StepKind, StepRecord, TraceLog};
use gridsynth_search::driver::{run_restarts, RunSummary};
use gridsynth_search::policy::{MethodConfig, SpaceConfig};
use gridsynth_search::{
    Cebs, HillClimbing, LatentSpace, ProgrammaticSpace, ScheduledHillClimbing, SearchError,
    SearchSpace, Task, TaskSetReward,
};

use crate::contract::TaskWorld;
use crate::policy::{PolicyConfig, PolicyError};
use crate::record::RunRecord;

/// Error during an end-to-end run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("seed program {index} is malformed: {source}")]
    SeedProgram {
        index: usize,
        #[source]
        source: MalformedProgram,
    },
    #[error("transcript rendering failed: {detail}")]
    Transcript { detail: String },
    #[error("run record I/O failed: {detail}")]
    Io { detail: String },
}

// ---------------------------------------------------------------------------
// Episode evaluation
// ---------------------------------------------------------------------------

/// One task instance exposed as a search [`Task`].
#[derive(Debug, Clone)]
pub struct EpisodeRunner<T> {
    task: T,
    id: String,
    style: RenderStyle,
}

impl<T: TaskWorld> EpisodeRunner<T> {
    /// `index` distinguishes instances of the same task family.
    pub fn new(task: T, index: usize) -> Self {
        let id = format!("{}-{index}", task.name());
        Self {
            task,
            id,
            style: RenderStyle::Python,
        }
    }

    /// Rendering used for the `program` field of trace records.
    #[must_use]
    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn task(&self) -> &T {
        &self.task
    }

    /// Roll `program` out, calling `on_action` with each action's node and
    /// step reward (crash penalty not included). Returns the summed step
    /// rewards and whether the environment crashed.
    fn rollout(
        &mut self,
        program: &Ast,
        mut on_action: impl FnMut(NodeId, f64, bool),
    ) -> Option<(f64, bool)> {
        self.task.reset_episode();
        let mut env = self.task.initial_environment().clone();
        let mut total = 0.0;
        {
            let mut exec = match Execution::new(program, &mut env) {
                Ok(exec) => exec,
                Err(error) => {
                    warn!(task = %self.id, %error, "program refused by the interpreter");
                    return None;
                }
            };
            while let Some(step) = exec.next_action() {
                let reward = self.task.step_reward(exec.env());
                let crashed = exec.env().is_crashed();
                total += reward.reward;
                on_action(step.node, reward.reward, crashed);
                if reward.terminated || crashed {
                    break;
                }
            }
        }
        Some((total, env.is_crashed()))
    }
}

impl<T: TaskWorld> Task for EpisodeRunner<T> {
    fn task_id(&self) -> &str {
        &self.id
    }

    fn reset(&mut self) {
        self.task.reset_episode();
    }

    fn evaluate_program(&mut self, program: &Ast) -> f64 {
        self.rollout(program, |_, _, _| {})
            .map_or(self.task.crash_penalty(), |(total, _)| total)
    }

    fn record_evaluate_program(&mut self, program: &Ast) -> (f64, TraceLog) {
        self.task.reset_episode();
        let mut env = self.task.initial_environment().clone();
        let mut log = TraceLog::new(self.task.describe(&env));
        let mut total = 0.0;
        {
            let mut exec = match Execution::recording(program, &mut env) {
                Ok(exec) => exec,
                Err(error) => {
                    warn!(task = %self.id, %error, "program refused by the interpreter");
                    return (self.task.crash_penalty(), log);
                }
            };
            while let Some(event) = exec.next_event() {
                let rendering = render_marked(program, self.style, Some(event.node()));
                match event {
                    ExecEvent::Action(step) => {
                        let reward = self.task.step_reward(exec.env());
                        let crashed = exec.env().is_crashed();
                        total += reward.reward;
                        log.push(StepRecord {
                            kind: StepKind::Action,
                            node: step.node,
                            name: step.name.to_string(),
                            result: None,
                            state: exec.env().partial_state(),
                            reward: reward.reward,
                            terminated: reward.terminated,
                            program: rendering,
                        });
                        if reward.terminated || crashed {
                            break;
                        }
                    }
                    ExecEvent::Perception(step) => log.push(StepRecord {
                        kind: StepKind::Perception,
                        node: step.node,
                        name: step.name.to_string(),
                        result: Some(step.result),
                        state: exec.env().partial_state(),
                        reward: 0.0,
                        terminated: false,
                        program: rendering,
                    }),
                }
            }
        }
        log.crashed = env.is_crashed();
        (total, log)
    }

    fn evaluate_and_assign_credit(&mut self, program: &Ast) -> (f64, NodeCredit) {
        let penalty = self.task.crash_penalty();
        let mut credit = NodeCredit::new(program);
        let outcome = self.rollout(program, |node, reward, crashed| {
            let reward = if crashed { reward + penalty } else { reward };
            credit.credit(program, node, reward);
        });
        match outcome {
            Some((total, crashed)) => {
                let total = if crashed { total + penalty } else { total };
                (total, credit)
            }
            None => (penalty, credit),
        }
    }
}

// ---------------------------------------------------------------------------
// End-to-end run
// ---------------------------------------------------------------------------

/// Run the search configured by `policy`, starting from `seed_programs`
/// (canonical token strings) before falling back to random individuals.
///
/// # Errors
///
/// Returns [`RunError`] if the policy is invalid or a seed program does not
/// decode under the policy's numeral policy.
pub fn run(policy: &PolicyConfig, seed_programs: &[String]) -> Result<RunRecord, RunError> {
    policy.validate()?;
    let vocab = Vocabulary::karel();
    let decoder = Decoder::new(&vocab).with_numeral_policy(policy.numeral_policy);
    let seeds = seed_programs
        .iter()
        .enumerate()
        .map(|(index, text)| {
            decoder
                .decode(text)
                .map_err(|source| RunError::SeedProgram { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let tasks: Vec<_> = policy
        .tasks()
        .into_iter()
        .enumerate()
        .map(|(index, task)| EpisodeRunner::new(task, index))
        .collect();
    let mut reward = TaskSetReward::new(tasks)?;

    info!(
        task = policy.task.name(),
        method = policy.method.name(),
        space = policy.space.name(),
        envs = policy.env_count(),
        budget = policy.budget(),
        "run started"
    );
    let summary = match &policy.space {
        SpaceConfig::Programmatic(config) => {
            let mut space = ProgrammaticSpace::new(vocab.clone(), config.clone(), policy.seed);
            drive(&mut space, policy, &mut reward, &vocab, &seeds)?
        }
        SpaceConfig::Latent(config) => {
            let mut space = LatentSpace::new(vocab.clone(), config.clone(), policy.seed);
            drive(&mut space, policy, &mut reward, &vocab, &seeds)?
        }
    };
    Ok(RunRecord::new(policy, &summary))
}

fn drive<S: SearchSpace>(
    space: &mut S,
    policy: &PolicyConfig,
    reward: &mut dyn gridsynth_search::RewardFn,
    vocab: &Vocabulary,
    seeds: &[Ast],
) -> Result<RunSummary, SearchError> {
    let driver = policy.driver_config();
    match &policy.method {
        MethodConfig::HillClimbing(config) => run_restarts(
            space,
            &mut HillClimbing::new(config.clone()),
            reward,
            vocab,
            &driver,
            seeds,
        ),
        MethodConfig::ScheduledHillClimbing(config) => run_restarts(
            space,
            &mut ScheduledHillClimbing::new(config.clone()),
            reward,
            vocab,
            &driver,
            seeds,
        ),
        MethodConfig::Cebs(config) => run_restarts(
            space,
            &mut Cebs::new(config.clone()),
            reward,
            vocab,
            &driver,
            seeds,
        ),
    }
}
