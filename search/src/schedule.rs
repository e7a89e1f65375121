//! Neighborhood-size schedule.
//!
//! `k(p)` moves from `start_k` at `p = 0` to `end_k` at `p = p_max`, where
//! `p` counts programs evaluated so far. The progress ratio is linear or
//! logarithmic in `p`, optionally reshaped by an S-curve, and `k` is
//! interpolated linearly or in log2 space, rounding up.

use std::f64::consts::PI;

use crate::policy::{InterpolationType, KScheduleConfig, RatioType, SchedulerType};

#[derive(Debug, Clone, PartialEq)]
pub struct KSchedule {
    config: KScheduleConfig,
}

impl KSchedule {
    #[must_use]
    pub fn new(config: KScheduleConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &KScheduleConfig {
        &self.config
    }

    /// Progress ratio in `[0, 1]` after reshaping.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self, programs: u64) -> f64 {
        let c = &self.config;
        if programs == 0 {
            return 0.0;
        }
        if programs >= c.max_programs {
            return 1.0;
        }
        let (p, p_max) = match c.ratio {
            RatioType::Linear => (programs as f64, c.max_programs as f64),
            RatioType::Log => ((programs as f64).log10(), (c.max_programs as f64).log10()),
        };
        let r = p / p_max;
        match c.scheduler {
            SchedulerType::Linear => r,
            SchedulerType::Sin => (((2.0 * r - 1.0) * PI / 2.0).sin() + 1.0) / 2.0,
        }
    }

    /// Neighborhood size after `programs` evaluations.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn k_at(&self, programs: u64) -> usize {
        let c = &self.config;
        if programs == 0 {
            return c.start_k;
        }
        if programs >= c.max_programs {
            return c.end_k;
        }
        let r = self.ratio(programs);
        let (start, end) = (c.start_k as f64, c.end_k as f64);
        let k = match c.interpolation {
            InterpolationType::Linear => start + (end - start) * r,
            InterpolationType::Log => {
                let (a, b) = (start.log2(), end.log2());
                (a + (b - a) * r).exp2()
            }
        };
        (k.ceil() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(
        ratio: RatioType,
        scheduler: SchedulerType,
        interpolation: InterpolationType,
    ) -> KSchedule {
        KSchedule::new(KScheduleConfig {
            start_k: 16,
            end_k: 1024,
            max_programs: 100_000,
            ratio,
            scheduler,
            interpolation,
        })
    }

    #[test]
    fn log_interpolation_hits_both_ends_and_is_monotone() {
        let s = schedule(RatioType::Linear, SchedulerType::Linear, InterpolationType::Log);
        assert_eq!(s.k_at(0), 16);
        assert_eq!(s.k_at(100_000), 1024);
        assert_eq!(s.k_at(250_000), 1024);
        let mut previous = 0;
        for p in (0..=100_000).step_by(997) {
            let k = s.k_at(p);
            assert!(k >= previous, "k({p}) = {k} < {previous}");
            previous = k;
        }
    }

    #[test]
    fn linear_interpolation_midpoint() {
        let s = schedule(RatioType::Linear, SchedulerType::Linear, InterpolationType::Linear);
        // 16 + (1024 - 16) * 0.5 = 520
        assert_eq!(s.k_at(50_000), 520);
    }

    #[test]
    fn log_interpolation_midpoint_is_the_geometric_mean() {
        let s = schedule(RatioType::Linear, SchedulerType::Linear, InterpolationType::Log);
        // 2^((4 + 10) / 2) = 128
        assert_eq!(s.k_at(50_000), 128);
    }

    #[test]
    fn sin_scheduler_is_symmetric_about_the_middle() {
        let s = schedule(RatioType::Linear, SchedulerType::Sin, InterpolationType::Linear);
        assert!((s.ratio(50_000) - 0.5).abs() < 1e-12);
        assert!(s.ratio(10_000) < 0.1);
        assert!((s.ratio(10_000) + s.ratio(90_000) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn log_ratio_moves_fast_early() {
        let s = schedule(RatioType::Log, SchedulerType::Linear, InterpolationType::Linear);
        // log10(1000) / log10(100000) = 0.6
        assert!((s.ratio(1_000) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn decreasing_schedules_are_supported() {
        let s = KSchedule::new(KScheduleConfig {
            start_k: 256,
            end_k: 4,
            max_programs: 1_000,
            ratio: RatioType::Linear,
            scheduler: SchedulerType::Linear,
            interpolation: InterpolationType::Log,
        });
        assert_eq!(s.k_at(0), 256);
        assert_eq!(s.k_at(500), 32);
        assert_eq!(s.k_at(1_000), 4);
    }
}
