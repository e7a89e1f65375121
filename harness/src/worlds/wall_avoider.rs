//! Fill the inner ring of a walled room with markers.
//!
//! The agent starts at a random interior cell and heading. Cells adjacent
//! to the border walls are off-limits for markers; every other interior cell
//! should receive exactly one. Each new marker is worth `1 / max_markers`.
//! Marking an off-limits cell, stacking two markers or picking one up ends
//! the episode with the crash penalty.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::contract::{StepReward, TaskWorld};
use crate::worlds::karel::{Direction, KarelConfig, KarelWorld};
use crate::worlds::DEFAULT_CRASH_PENALTY;

#[derive(Debug, Clone)]
pub struct WallAvoider {
    initial: KarelWorld,
    /// Row-major: interior cells touching the border walls.
    illegal: Vec<bool>,
    max_markers: u32,
    previous_markers: u32,
    crash_penalty: f64,
}

impl WallAvoider {
    #[must_use]
    pub fn new(config: &KarelConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (rows, cols) = (config.rows, config.cols);
        let mut world = KarelWorld::new(config);
        world.add_border();

        let (inner_rows, inner_cols) = (rows.saturating_sub(2).max(1), cols.saturating_sub(2).max(1));
        let draw = rng.gen_range(0..4 * inner_rows * inner_cols);
        let col = draw % inner_cols + 1;
        let row = (draw / inner_cols) % inner_rows + 1;
        let facing = Direction::from_index(draw / (inner_rows * inner_cols));
        world.place_agent(row.min(rows.saturating_sub(1)), col.min(cols.saturating_sub(1)), facing);

        let mut illegal = vec![false; rows * cols];
        for r in 1..rows.saturating_sub(1) {
            for c in 1..cols.saturating_sub(1) {
                illegal[r * cols + c] = r == 1 || c == 1 || r + 2 == rows || c + 2 == cols;
            }
        }

        let max_markers = u32::try_from(rows.saturating_sub(4) * cols.saturating_sub(4)).unwrap_or(u32::MAX);
        Self {
            initial: world,
            illegal,
            max_markers,
            previous_markers: 0,
            crash_penalty: DEFAULT_CRASH_PENALTY,
        }
    }

    #[must_use]
    pub fn with_crash_penalty(mut self, penalty: f64) -> Self {
        self.crash_penalty = penalty;
        self
    }

    /// Markers in a perfect solution.
    #[must_use]
    pub fn max_markers(&self) -> u32 {
        self.max_markers
    }

    #[must_use]
    pub fn is_off_limits(&self, row: usize, col: usize) -> bool {
        row < self.initial.rows()
            && col < self.initial.cols()
            && self.illegal[row * self.initial.cols() + col]
    }
}

impl TaskWorld for WallAvoider {
    type Env = KarelWorld;

    fn name(&self) -> &str {
        "wall_avoider"
    }

    fn initial_environment(&self) -> &KarelWorld {
        &self.initial
    }

    fn reset_episode(&mut self) {
        self.previous_markers = 0;
    }

    fn step_reward(&mut self, env: &KarelWorld) -> StepReward {
        let markers = env.total_markers();
        let mut result = StepReward::proceed(
            (f64::from(markers) - f64::from(self.previous_markers))
                / f64::from(self.max_markers.max(1)),
        );
        let grid = env.marker_grid();
        if grid.iter().zip(&self.illegal).any(|(&m, &off)| off && m > 0) {
            result = StepReward::terminate(self.crash_penalty);
        }
        if grid.iter().any(|&m| m > 1) || markers < self.previous_markers {
            result = StepReward::terminate(self.crash_penalty);
        } else if markers == self.max_markers {
            result.terminated = true;
        }
        self.previous_markers = markers;
        result
    }

    fn crash_penalty(&self) -> f64 {
        self.crash_penalty
    }

    fn describe(&self, env: &KarelWorld) -> String {
        env.full_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsynth_kernel::env::Environment;

    fn config() -> KarelConfig {
        KarelConfig {
            rows: 8,
            cols: 5,
            ..KarelConfig::default()
        }
    }

    #[test]
    fn agent_starts_inside_the_room() {
        for seed in 0..64 {
            let t = WallAvoider::new(&config(), seed);
            let (r, c, _) = t.initial_environment().agent();
            assert!((1..=6).contains(&r) && (1..=3).contains(&c), "seed {seed}: ({r}, {c})");
            assert!(!t.initial_environment().is_wall(r, c));
        }
    }

    #[test]
    fn off_limits_ring_and_target_count() {
        let t = WallAvoider::new(&config(), 0);
        assert_eq!(t.max_markers(), 4);
        assert!(t.is_off_limits(1, 2));
        assert!(t.is_off_limits(6, 2));
        assert!(t.is_off_limits(3, 1));
        assert!(t.is_off_limits(3, 3));
        assert!(!t.is_off_limits(3, 2));
        assert!(!t.is_off_limits(0, 0));
    }

    #[test]
    fn marking_an_inner_cell_is_rewarded() {
        let mut t = WallAvoider::new(&config(), 0);
        t.reset_episode();
        let mut env = t.initial_environment().clone();
        env.place_agent(3, 2, Direction::North);
        env.perform("putMarker");
        let step = t.step_reward(&env);
        assert!(!step.terminated);
        assert!((step.reward - 0.25).abs() < 1e-12);
    }

    #[test]
    fn marking_next_to_a_wall_is_penalized() {
        let mut t = WallAvoider::new(&config(), 0);
        t.reset_episode();
        let mut env = t.initial_environment().clone();
        env.place_agent(1, 1, Direction::North);
        env.perform("putMarker");
        assert_eq!(t.step_reward(&env), StepReward::terminate(DEFAULT_CRASH_PENALTY));
    }

    #[test]
    fn stacking_markers_is_penalized() {
        let mut t = WallAvoider::new(&config(), 0);
        t.reset_episode();
        let mut env = t.initial_environment().clone();
        env.place_agent(4, 2, Direction::North);
        env.perform("putMarker");
        assert!(!t.step_reward(&env).terminated);
        env.perform("putMarker");
        assert_eq!(t.step_reward(&env), StepReward::terminate(DEFAULT_CRASH_PENALTY));
    }

    #[test]
    fn filling_every_inner_cell_terminates() {
        let mut t = WallAvoider::new(&config(), 0);
        t.reset_episode();
        let mut env = t.initial_environment().clone();
        for r in 2..=5 {
            env.set_markers(r, 2, 1);
        }
        let step = t.step_reward(&env);
        assert!(step.terminated);
        assert!((step.reward - 1.0).abs() < 1e-12);
    }
}
