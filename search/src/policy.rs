//! Search configuration types.
//!
//! Every config is plain data with a `Default` and a `validate` pre-flight
//! check. [`MethodConfig`] and [`SpaceConfig`] select a search method and a
//! search space by name when a run is configured from JSON.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::space::{LatentSpaceConfig, ProgrammaticSpaceConfig, DEFAULT_SEED_ENCODE_RETRIES};

/// Reward at which a search stops early.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 1.0;
/// Neighbors requested per round.
pub const DEFAULT_K: usize = 1024;
/// CEBS elite-set size.
pub const DEFAULT_ELITES: usize = 2;
/// Evaluation horizon of the `k` schedule.
pub const DEFAULT_MAX_PROGRAMS: u64 = 1_000_000;

fn check_threshold(threshold: f64) -> Result<(), SearchError> {
    if threshold.is_nan() {
        return Err(SearchError::InvalidConfig {
            detail: "success_threshold must be a number".into(),
        });
    }
    Ok(())
}

fn check_k(k: usize, what: &str) -> Result<(), SearchError> {
    if k == 0 {
        return Err(SearchError::InvalidConfig {
            detail: format!("{what} must be positive"),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillClimbingConfig {
    pub k: usize,
    pub success_threshold: f64,
    pub seed_encode_retries: usize,
}

impl Default for HillClimbingConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            seed_encode_retries: DEFAULT_SEED_ENCODE_RETRIES,
        }
    }
}

impl HillClimbingConfig {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] for `k == 0` or a NaN threshold.
    pub fn validate(&self) -> Result<(), SearchError> {
        check_k(self.k, "k")?;
        check_threshold(self.success_threshold)
    }
}

/// Progress measure fed to the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioType {
    /// `p / p_max`.
    Linear,
    /// `log10(p) / log10(p_max)`.
    Log,
}

/// Reshaping of the progress ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerType {
    Linear,
    /// S-curve `(sin((2r - 1) * pi / 2) + 1) / 2`.
    Sin,
}

/// Space in which `k` moves from `start_k` to `end_k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationType {
    Linear,
    /// Interpolate `log2(k)`.
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KScheduleConfig {
    pub start_k: usize,
    pub end_k: usize,
    /// Horizon `p_max`, in evaluated programs.
    pub max_programs: u64,
    pub ratio: RatioType,
    pub scheduler: SchedulerType,
    pub interpolation: InterpolationType,
}

impl Default for KScheduleConfig {
    fn default() -> Self {
        Self {
            start_k: 16,
            end_k: 1024,
            max_programs: DEFAULT_MAX_PROGRAMS,
            ratio: RatioType::Linear,
            scheduler: SchedulerType::Linear,
            interpolation: InterpolationType::Log,
        }
    }
}

impl KScheduleConfig {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] for a zero `k` bound or horizon.
    pub fn validate(&self) -> Result<(), SearchError> {
        check_k(self.start_k, "start_k")?;
        check_k(self.end_k, "end_k")?;
        if self.max_programs == 0 {
            return Err(SearchError::InvalidConfig {
                detail: "max_programs must be positive".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduledConfig {
    pub schedule: KScheduleConfig,
    pub success_threshold: f64,
    pub seed_encode_retries: usize,
}

impl Default for ScheduledConfig {
    fn default() -> Self {
        Self {
            schedule: KScheduleConfig::default(),
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            seed_encode_retries: DEFAULT_SEED_ENCODE_RETRIES,
        }
    }
}

impl ScheduledConfig {
    /// # Errors
    ///
    /// See [`KScheduleConfig::validate`].
    pub fn validate(&self) -> Result<(), SearchError> {
        self.schedule.validate()?;
        check_threshold(self.success_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CebsConfig {
    /// Candidates per round, split evenly across the elites.
    pub k: usize,
    /// Elite-set size.
    pub e: usize,
    pub success_threshold: f64,
    pub seed_encode_retries: usize,
}

impl Default for CebsConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            e: DEFAULT_ELITES,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            seed_encode_retries: DEFAULT_SEED_ENCODE_RETRIES,
        }
    }
}

impl CebsConfig {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] unless `1 <= e <= k`.
    pub fn validate(&self) -> Result<(), SearchError> {
        check_k(self.k, "k")?;
        check_k(self.e, "e")?;
        if self.e > self.k {
            return Err(SearchError::InvalidConfig {
                detail: format!("e ({}) must not exceed k ({})", self.e, self.k),
            });
        }
        check_threshold(self.success_threshold)
    }
}

/// Search method selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MethodConfig {
    HillClimbing(HillClimbingConfig),
    ScheduledHillClimbing(ScheduledConfig),
    Cebs(CebsConfig),
}

impl Default for MethodConfig {
    fn default() -> Self {
        Self::HillClimbing(HillClimbingConfig::default())
    }
}

impl MethodConfig {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::HillClimbing(_) => "hill_climbing",
            Self::ScheduledHillClimbing(_) => "scheduled_hill_climbing",
            Self::Cebs(_) => "cebs",
        }
    }

    /// Success threshold of the selected method.
    #[must_use]
    pub fn success_threshold(&self) -> f64 {
        match self {
            Self::HillClimbing(c) => c.success_threshold,
            Self::ScheduledHillClimbing(c) => c.success_threshold,
            Self::Cebs(c) => c.success_threshold,
        }
    }

    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] for an invalid method config.
    pub fn validate(&self) -> Result<(), SearchError> {
        match self {
            Self::HillClimbing(c) => c.validate(),
            Self::ScheduledHillClimbing(c) => c.validate(),
            Self::Cebs(c) => c.validate(),
        }
    }
}

/// Search space selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "space", rename_all = "snake_case")]
pub enum SpaceConfig {
    Programmatic(ProgrammaticSpaceConfig),
    Latent(LatentSpaceConfig),
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self::Programmatic(ProgrammaticSpaceConfig::default())
    }
}

impl SpaceConfig {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Programmatic(_) => "programmatic",
            Self::Latent(_) => "latent",
        }
    }

    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] for an invalid space config.
    pub fn validate(&self) -> Result<(), SearchError> {
        match self {
            Self::Programmatic(c) => c.validate(),
            Self::Latent(c) => c.validate(),
        }
    }
}

/// Check a method/space pairing before any search starts.
///
/// # Errors
///
/// Returns [`SearchError::RequiresLatentSpace`] for CEBS over the
/// programmatic space, or the first invalid field of either config.
pub fn validate_pairing(method: &MethodConfig, space: &SpaceConfig) -> Result<(), SearchError> {
    method.validate()?;
    space.validate()?;
    if matches!(method, MethodConfig::Cebs(_)) && !matches!(space, SpaceConfig::Latent(_)) {
        return Err(SearchError::RequiresLatentSpace {
            method: method.name().into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(HillClimbingConfig::default().validate().is_ok());
        assert!(ScheduledConfig::default().validate().is_ok());
        assert!(CebsConfig::default().validate().is_ok());
        assert!(validate_pairing(&MethodConfig::default(), &SpaceConfig::default()).is_ok());
    }

    #[test]
    fn cebs_needs_the_latent_space() {
        let method = MethodConfig::Cebs(CebsConfig::default());
        assert_eq!(
            validate_pairing(&method, &SpaceConfig::default()),
            Err(SearchError::RequiresLatentSpace {
                method: "cebs".into()
            })
        );
        let latent = SpaceConfig::Latent(LatentSpaceConfig::default());
        assert!(validate_pairing(&method, &latent).is_ok());
    }

    #[test]
    fn more_elites_than_candidates_is_rejected() {
        let config = CebsConfig {
            k: 4,
            e: 8,
            ..CebsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SearchError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn method_config_parses_from_tagged_json() {
        let json = r#"{
            "method": "scheduled_hill_climbing",
            "schedule": { "start_k": 8, "end_k": 64, "scheduler": "sin" }
        }"#;
        let parsed: MethodConfig = serde_json::from_str(json).expect("parse");
        let MethodConfig::ScheduledHillClimbing(config) = parsed else {
            panic!("wrong variant");
        };
        assert_eq!(config.schedule.start_k, 8);
        assert_eq!(config.schedule.scheduler, SchedulerType::Sin);
        assert_eq!(config.schedule.interpolation, InterpolationType::Log);
        assert!((config.success_threshold - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn space_config_round_trips_through_json() {
        let space = SpaceConfig::Latent(LatentSpaceConfig {
            dimension: 32,
            ..LatentSpaceConfig::default()
        });
        let json = serde_json::to_string(&space).expect("serialize");
        assert!(json.contains("\"space\":\"latent\""));
        let back: SpaceConfig = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, space);
    }
}
