//! Karel world and the tasks built on it.

pub mod karel;
pub mod path_follow;
pub mod wall_avoider;

use serde::{Deserialize, Serialize};

use crate::contract::{StepReward, TaskWorld};
use karel::{KarelConfig, KarelWorld};
use path_follow::PathFollow;
use wall_avoider::WallAvoider;

/// Reward for an illegal step, and the extra penalty for a crash in credit mode.
pub const DEFAULT_CRASH_PENALTY: f64 = -1.0;

/// Task family selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    PathFollow,
    WallAvoider,
}

impl TaskKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::PathFollow => "path_follow",
            Self::WallAvoider => "wall_avoider",
        }
    }

    /// Grid size the task is usually run at.
    #[must_use]
    pub fn default_dimensions(self) -> (usize, usize) {
        match self {
            Self::PathFollow => (8, 8),
            Self::WallAvoider => (8, 5),
        }
    }

    /// Smallest grid on which the task has something to do.
    #[must_use]
    pub fn min_dimensions(self) -> (usize, usize) {
        match self {
            Self::PathFollow => (4, 4),
            Self::WallAvoider => (5, 5),
        }
    }

    /// Instance number `seed` of this task family.
    #[must_use]
    pub fn instance(self, config: &KarelConfig, seed: u64, crash_penalty: f64) -> KarelTask {
        match self {
            Self::PathFollow => {
                KarelTask::PathFollow(PathFollow::new(config, seed).with_crash_penalty(crash_penalty))
            }
            Self::WallAvoider => {
                KarelTask::WallAvoider(WallAvoider::new(config, seed).with_crash_penalty(crash_penalty))
            }
        }
    }
}

/// Any Karel task, dispatched statically.
#[derive(Debug, Clone)]
pub enum KarelTask {
    PathFollow(PathFollow),
    WallAvoider(WallAvoider),
}

impl TaskWorld for KarelTask {
    type Env = KarelWorld;

    fn name(&self) -> &str {
        match self {
            Self::PathFollow(t) => t.name(),
            Self::WallAvoider(t) => t.name(),
        }
    }

    fn initial_environment(&self) -> &KarelWorld {
        match self {
            Self::PathFollow(t) => t.initial_environment(),
            Self::WallAvoider(t) => t.initial_environment(),
        }
    }

    fn reset_episode(&mut self) {
        match self {
            Self::PathFollow(t) => t.reset_episode(),
            Self::WallAvoider(t) => t.reset_episode(),
        }
    }

    fn step_reward(&mut self, env: &KarelWorld) -> StepReward {
        match self {
            Self::PathFollow(t) => t.step_reward(env),
            Self::WallAvoider(t) => t.step_reward(env),
        }
    }

    fn crash_penalty(&self) -> f64 {
        match self {
            Self::PathFollow(t) => t.crash_penalty(),
            Self::WallAvoider(t) => t.crash_penalty(),
        }
    }

    fn describe(&self, env: &KarelWorld) -> String {
        env.full_state()
    }
}
