//! Task-world contract: the minimal trait a grid task must implement.
//!
//! A task world owns a canonical initial environment and per-episode reward
//! bookkeeping. It does NOT run programs, accumulate rewards or build trace
//! logs: those are [`crate::runner::EpisodeRunner`] concerns.

use gridsynth_kernel::env::Environment;

/// Reward signal for one executed action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReward {
    /// `true` ends the episode after this action.
    pub terminated: bool,
    pub reward: f64,
}

impl StepReward {
    #[must_use]
    pub fn proceed(reward: f64) -> Self {
        Self {
            terminated: false,
            reward,
        }
    }

    #[must_use]
    pub fn terminate(reward: f64) -> Self {
        Self {
            terminated: true,
            reward,
        }
    }
}

/// The contract a task must implement to be run by [`crate::runner::EpisodeRunner`].
pub trait TaskWorld {
    type Env: Environment;

    /// Task family name (e.g. `"path_follow"`).
    fn name(&self) -> &str;

    /// Canonical start state. Every episode runs on a clone of it.
    fn initial_environment(&self) -> &Self::Env;

    /// Reset reward bookkeeping before an episode.
    fn reset_episode(&mut self);

    /// Reward for the state reached by the most recent action.
    fn step_reward(&mut self, env: &Self::Env) -> StepReward;

    /// Added to the episode return when the environment crashed.
    fn crash_penalty(&self) -> f64;

    /// Full textual state, used as the first entry of a trace log.
    fn describe(&self, env: &Self::Env) -> String;
}
