//! Run policy: the declared conditions of a synthesis run.
//!
//! [`PolicyConfig`] selects the task family, the environment instances, the
//! search method and space, and the evaluation budget. Unset overrides fall
//! back to the `DEFAULT_*` constants. [`PolicyConfig::snapshot`] renders the
//! fully-resolved policy as JSON; the run record embeds it and its
//! fingerprint commits to it.

use serde::{Deserialize, Serialize};

use gridsynth_kernel::dsl::NumeralPolicy;
use gridsynth_kernel::env::DEFAULT_MAX_CALLS;
use gridsynth_kernel::fingerprint::{canonical_hash, ContentHash, HashDomain};
use gridsynth_search::driver::DEFAULT_ITERATIONS_PER_SEARCH;
use gridsynth_search::policy::{validate_pairing, MethodConfig, SpaceConfig, DEFAULT_MAX_PROGRAMS};
use gridsynth_search::{DriverConfig, SearchError};

use crate::worlds::karel::KarelConfig;
use crate::worlds::{KarelTask, TaskKind, DEFAULT_CRASH_PENALTY};

/// Task instances averaged per evaluation.
pub const DEFAULT_NUM_ENVS: usize = 32;

/// Error validating a run policy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid run policy: {detail}")]
    Invalid { detail: String },
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Policy configuration; `None` fields use defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub task: TaskKind,
    /// Number of task instances; instance `i` is generated from seed `i`.
    pub num_envs: Option<usize>,
    /// Seed of the search space's random generator.
    pub seed: u64,
    /// `None` uses the task's usual grid size.
    pub rows: Option<usize>,
    pub cols: Option<usize>,
    pub crashable: bool,
    pub leaps_behaviour: bool,
    pub max_calls: Option<u64>,
    pub crash_penalty: Option<f64>,
    pub method: MethodConfig,
    pub space: SpaceConfig,
    /// Total programs evaluated before no new search starts.
    pub budget: Option<u64>,
    pub iterations_per_search: Option<usize>,
    /// How seed programs with out-of-range `REPEAT` counts are decoded.
    pub numeral_policy: NumeralPolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            task: TaskKind::PathFollow,
            num_envs: None,
            seed: 0,
            rows: None,
            cols: None,
            crashable: false,
            leaps_behaviour: true,
            max_calls: None,
            crash_penalty: None,
            method: MethodConfig::default(),
            space: SpaceConfig::default(),
            budget: None,
            iterations_per_search: None,
            numeral_policy: NumeralPolicy::default(),
        }
    }
}

impl PolicyConfig {
    #[must_use]
    pub fn env_count(&self) -> usize {
        self.num_envs.unwrap_or(DEFAULT_NUM_ENVS)
    }

    /// `(rows, cols)` after defaults.
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        let (rows, cols) = self.task.default_dimensions();
        (self.rows.unwrap_or(rows), self.cols.unwrap_or(cols))
    }

    #[must_use]
    pub fn budget(&self) -> u64 {
        self.budget.unwrap_or(DEFAULT_MAX_PROGRAMS)
    }

    #[must_use]
    pub fn crash_penalty(&self) -> f64 {
        self.crash_penalty.unwrap_or(DEFAULT_CRASH_PENALTY)
    }

    #[must_use]
    pub fn karel_config(&self) -> KarelConfig {
        let (rows, cols) = self.dimensions();
        KarelConfig {
            rows,
            cols,
            crashable: self.crashable,
            leaps_behaviour: self.leaps_behaviour,
            max_calls: self.max_calls.unwrap_or(DEFAULT_MAX_CALLS),
        }
    }

    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            budget: self.budget(),
            iterations_per_search: self
                .iterations_per_search
                .unwrap_or(DEFAULT_ITERATIONS_PER_SEARCH),
            success_threshold: self.method.success_threshold(),
        }
    }

    /// Task instances `0..env_count()`.
    #[must_use]
    pub fn tasks(&self) -> Vec<KarelTask> {
        let config = self.karel_config();
        let penalty = self.crash_penalty();
        (0..self.env_count() as u64)
            .map(|seed| self.task.instance(&config, seed, penalty))
            .collect()
    }

    /// Pre-flight check of every field.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] for an empty environment set, a grid too small
    /// for the task, a non-finite crash penalty, or an invalid search setup.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.env_count() == 0 {
            return Err(PolicyError::Invalid {
                detail: "num_envs must be positive".into(),
            });
        }
        let (rows, cols) = self.dimensions();
        let (min_rows, min_cols) = self.task.min_dimensions();
        if rows < min_rows || cols < min_cols {
            return Err(PolicyError::Invalid {
                detail: format!(
                    "{} needs at least a {min_rows}x{min_cols} grid, got {rows}x{cols}",
                    self.task.name()
                ),
            });
        }
        if !self.crash_penalty().is_finite() {
            return Err(PolicyError::Invalid {
                detail: "crash_penalty must be finite".into(),
            });
        }
        if self.iterations_per_search == Some(0) {
            return Err(PolicyError::Invalid {
                detail: "iterations_per_search must be positive".into(),
            });
        }
        validate_pairing(&self.method, &self.space)?;
        self.driver_config().validate()?;
        Ok(())
    }

    /// Fully-resolved policy as JSON. Object keys serialize sorted.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        let (rows, cols) = self.dimensions();
        let karel = self.karel_config();
        serde_json::json!({
            "budget": self.budget(),
            "environment": {
                "cols": cols,
                "crash_penalty": self.crash_penalty(),
                "crashable": karel.crashable,
                "leaps_behaviour": karel.leaps_behaviour,
                "max_calls": karel.max_calls,
                "num_envs": self.env_count(),
                "rows": rows,
            },
            "iterations_per_search": self.driver_config().iterations_per_search,
            "method": self.method,
            "numeral_policy": self.numeral_policy,
            "schema_version": "policy.v1",
            "seed": self.seed,
            "space": self.space,
            "task": self.task,
        })
    }

    /// Domain-separated hash of the canonical snapshot bytes.
    #[must_use]
    pub fn snapshot_hash(&self) -> ContentHash {
        let bytes = serde_json::to_vec(&self.snapshot()).unwrap_or_default();
        canonical_hash(HashDomain::PolicySnapshot, &bytes)
    }
}
