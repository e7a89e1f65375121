//! Follow a marker trail from the bottom-left corner to the top-right one.
//!
//! The walled map carries one marker on every cell of a random monotone
//! staircase path (up or right at each step). Each picked marker is worth
//! `1 / initial_markers`. Putting a marker down or leaving the corridor
//! around the path ends the episode with the crash penalty.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::contract::{StepReward, TaskWorld};
use crate::worlds::karel::{Direction, KarelConfig, KarelWorld};
use crate::worlds::DEFAULT_CRASH_PENALTY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Up,
    Right,
}

#[derive(Debug, Clone)]
pub struct PathFollow {
    initial: KarelWorld,
    /// Row-major: path cells and their four neighbors.
    legal: Vec<bool>,
    initial_markers: u32,
    previous_markers: u32,
    crash_penalty: f64,
}

impl PathFollow {
    #[must_use]
    pub fn new(config: &KarelConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (rows, cols) = (config.rows, config.cols);
        let mut world = KarelWorld::new(config);
        world.add_border();

        let mut path: Vec<Step> = std::iter::repeat(Step::Up)
            .take(rows.saturating_sub(3))
            .chain(std::iter::repeat(Step::Right).take(cols.saturating_sub(3)))
            .collect();
        path.shuffle(&mut rng);

        let mut legal = vec![false; rows * cols];
        let mut mark = |world: &mut KarelWorld, r: usize, c: usize| {
            world.set_markers(r, c, 1);
            legal[r * cols + c] = true;
            for (dr, dc) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                if let (Some(nr), Some(nc)) = (r.checked_add_signed(dr), c.checked_add_signed(dc)) {
                    if nr < rows && nc < cols {
                        legal[nr * cols + nc] = true;
                    }
                }
            }
        };

        let (mut r, mut c) = (rows.saturating_sub(2), 1.min(cols.saturating_sub(1)));
        world.place_agent(r, c, Direction::North);
        mark(&mut world, r, c);
        for step in path {
            match step {
                Step::Up => r -= 1,
                Step::Right => c += 1,
            }
            mark(&mut world, r, c);
        }

        let initial_markers = world.total_markers();
        Self {
            initial: world,
            legal,
            initial_markers,
            previous_markers: initial_markers,
            crash_penalty: DEFAULT_CRASH_PENALTY,
        }
    }

    #[must_use]
    pub fn with_crash_penalty(mut self, penalty: f64) -> Self {
        self.crash_penalty = penalty;
        self
    }

    /// Markers laid on the path.
    #[must_use]
    pub fn initial_markers(&self) -> u32 {
        self.initial_markers
    }

    #[must_use]
    pub fn is_legal(&self, row: usize, col: usize) -> bool {
        row < self.initial.rows()
            && col < self.initial.cols()
            && self.legal[row * self.initial.cols() + col]
    }
}

impl TaskWorld for PathFollow {
    type Env = KarelWorld;

    fn name(&self) -> &str {
        "path_follow"
    }

    fn initial_environment(&self) -> &KarelWorld {
        &self.initial
    }

    fn reset_episode(&mut self) {
        self.previous_markers = self.initial_markers;
    }

    fn step_reward(&mut self, env: &KarelWorld) -> StepReward {
        let markers = env.total_markers();
        let mut result = StepReward::proceed(
            (f64::from(self.previous_markers) - f64::from(markers))
                / f64::from(self.initial_markers.max(1)),
        );
        if markers > self.previous_markers {
            result = StepReward::terminate(self.crash_penalty);
        } else if markers == 0 {
            result.terminated = true;
        }
        let (row, col, _) = env.agent();
        if !self.is_legal(row, col) {
            result = StepReward::terminate(self.crash_penalty);
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

    fn task(seed: u64) -> PathFollow {
        PathFollow::new(&KarelConfig::default(), seed)
    }

    #[test]
    fn map_has_a_staircase_trail() {
        let t = task(0);
        let world = t.initial_environment();
        assert_eq!(t.initial_markers(), 8 + 8 - 5);
        assert_eq!(world.agent(), (6, 1, Direction::North));
        assert_eq!(world.markers_at(6, 1), 1);
        assert_eq!(world.markers_at(1, 6), 1);
        assert!(world.is_wall(0, 3) && world.is_wall(7, 3) && world.is_wall(3, 0));
        assert!(t.is_legal(6, 1) && t.is_legal(5, 1) && t.is_legal(6, 2));
    }

    #[test]
    fn same_seed_same_map() {
        assert_eq!(task(3).initial_environment(), task(3).initial_environment());
        let maps: Vec<String> = (0..8).map(|s| task(s).initial_environment().to_string()).collect();
        assert!(maps.iter().any(|m| *m != maps[0]));
    }

    #[test]
    fn picking_a_marker_is_rewarded() {
        let mut t = task(1);
        t.reset_episode();
        let mut env = t.initial_environment().clone();
        env.perform("pickMarker");
        let step = t.step_reward(&env);
        assert!(!step.terminated);
        assert!((step.reward - 1.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn putting_a_marker_is_penalized() {
        let mut t = task(1);
        t.reset_episode();
        let mut env = t.initial_environment().clone();
        env.perform("putMarker");
        assert_eq!(t.step_reward(&env), StepReward::terminate(DEFAULT_CRASH_PENALTY));
    }

    #[test]
    fn leaving_the_corridor_is_penalized() {
        let mut t = task(2);
        t.reset_episode();
        let mut env = t.initial_environment().clone();
        // A staircase cannot pass near both the top-left and bottom-right corners.
        let (r, c) = [(1, 1), (6, 6)]
            .into_iter()
            .find(|&(r, c)| !t.is_legal(r, c))
            .expect("one corner is off the trail");
        env.place_agent(r, c, Direction::North);
        assert_eq!(t.step_reward(&env), StepReward::terminate(DEFAULT_CRASH_PENALTY));
    }

    #[test]
    fn collecting_every_marker_terminates() {
        let mut t = task(4);
        t.reset_episode();
        let mut env = t.initial_environment().clone();
        for r in 0..env.rows() {
            for c in 0..env.cols() {
                env.set_markers(r, c, 0);
            }
        }
        let step = t.step_reward(&env);
        assert!(step.terminated);
        assert!((step.reward - 1.0).abs() < 1e-12);
    }
}
