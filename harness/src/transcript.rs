//! Transcript rendering: record-mode trace logs as JSON.
//!
//! A transcript is a derived view. It is rebuilt from a program and a run
//! policy by re-running the program in record mode on every task instance,
//! so the same inputs always give byte-identical output.
//!
//! Each episode is a list of entries. The first carries the full initial
//! state and the unmarked program; each later entry is one action or
//! perception with the partial state and the program rendered with that
//! step's line marked.

use serde_json::{json, Value};

use gridsynth_kernel::dsl::{encode, render_indented, Ast, RenderStyle};
use gridsynth_kernel::exec::{StepKind, TraceLog};
use gridsynth_search::{Task, TaskSetReward};

use crate::policy::PolicyConfig;
use crate::runner::{EpisodeRunner, RunError};

/// Entries of one episode.
#[must_use]
pub fn episode_entries(log: &TraceLog, program: &Ast, style: RenderStyle) -> Vec<Value> {
    let mut entries = Vec::with_capacity(log.steps.len() + 1);
    entries.push(json!({
        "program_str": render_indented(program, style),
        "state": log.initial_state,
    }));
    for step in &log.steps {
        let entry = match step.kind {
            StepKind::Action => json!({
                "instant_reward": step.reward,
                "name": step.name,
                "program_str": step.program,
                "state": step.state,
                "terminated": step.terminated,
                "type": "action",
            }),
            StepKind::Perception => json!({
                "name": step.name,
                "program_str": step.program,
                "result": step.result,
                "state": step.state,
                "type": "perception",
            }),
        };
        entries.push(entry);
    }
    entries
}

/// Canonical JSON bytes of a transcript over `episodes` (task id, log).
///
/// # Errors
///
/// Returns the serializer error if rendering fails.
pub fn render_transcript<'a>(
    program: &Ast,
    mean_reward: f64,
    episodes: impl IntoIterator<Item = (&'a str, &'a TraceLog)>,
) -> Result<Vec<u8>, serde_json::Error> {
    let episodes: Vec<Value> = episodes
        .into_iter()
        .map(|(task, log)| {
            json!({
                "crashed": log.crashed,
                "entries": episode_entries(log, program, RenderStyle::Python),
                "task": task,
                "total_reward": log.total_reward,
            })
        })
        .collect();
    serde_json::to_vec(&json!({
        "episodes": episodes,
        "mean_reward": mean_reward,
        "program": encode(program),
        "schema_version": "transcript.v1",
    }))
}

/// Re-run `program` in record mode on the task instances of `policy`.
///
/// # Errors
///
/// Returns [`RunError`] if the policy is invalid.
pub fn transcribe(policy: &PolicyConfig, program: &Ast) -> Result<Vec<u8>, RunError> {
    policy.validate()?;
    let tasks: Vec<_> = policy
        .tasks()
        .into_iter()
        .enumerate()
        .map(|(index, task)| EpisodeRunner::new(task, index))
        .collect();
    let mut reward = TaskSetReward::new(tasks)?;
    let (mean, logs) = reward.record(program);
    let ids: Vec<&str> = reward.tasks().iter().map(Task::task_id).collect();
    render_transcript(program, mean, ids.into_iter().zip(&logs)).map_err(|e| RunError::Transcript {
        detail: e.to_string(),
    })
}
