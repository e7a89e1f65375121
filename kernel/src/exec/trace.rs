//! Record-mode trace log types.
//!
//! A [`TraceLog`] is what a task's recording evaluation returns: one
//! [`StepRecord`] per visited primitive, in execution order, each carrying
//! the agent's partial surroundings at that moment and the program rendered
//! with the executing line marked.

use serde::{Deserialize, Serialize};

use crate::dsl::NodeId;

/// Primitive kind of a trace step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Action,
    Perception,
}

/// One visited primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub kind: StepKind,
    pub node: NodeId,
    pub name: String,
    /// Perception outcome; `None` for actions.
    pub result: Option<bool>,
    /// Partial state after the step (after the action, or at evaluation time).
    pub state: String,
    /// Instantaneous reward; always `0.0` for perceptions.
    pub reward: f64,
    /// Whether the task reported termination at this step.
    pub terminated: bool,
    /// Program rendering with this step's line marked.
    pub program: String,
}

/// Ordered record of one rollout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceLog {
    pub initial_state: String,
    pub steps: Vec<StepRecord>,
    pub total_reward: f64,
    pub crashed: bool,
}

impl TraceLog {
    #[must_use]
    pub fn new(initial_state: String) -> Self {
        Self {
            initial_state,
            ..Self::default()
        }
    }

    pub fn push(&mut self, record: StepRecord) {
        self.total_reward += record.reward;
        self.steps.push(record);
    }

    /// Action steps only.
    pub fn actions(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.kind == StepKind::Action)
    }

    /// Last step, if any.
    #[must_use]
    pub fn last(&self) -> Option<&StepRecord> {
        self.steps.last()
    }
}
