//! Run record: the persisted result of a synthesis run.
//!
//! # Directory layout
//!
//! ```text
//! <dir>/
//!   run_record.json   canonical JSON, record body plus digest
//!   run_digest.txt    ASCII digest string (e.g. "sha256:...")
//! ```
//!
//! The digest is `canonical_hash(RunRecord, body)` where `body` is the
//! canonical JSON of every field except the digest itself. Reading a record
//! back recomputes it and fails closed on mismatch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gridsynth_kernel::dsl::encode;
use gridsynth_kernel::fingerprint::{canonical_hash, ContentHash, HashDomain, HASH_ALGORITHM};
use gridsynth_search::{DriverStop, HistoryPoint, RunSummary};

use crate::policy::PolicyConfig;
use crate::runner::RunError;

const RECORD_FILENAME: &str = "run_record.json";
const DIGEST_FILENAME: &str = "run_digest.txt";

/// Result of [`crate::runner::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub schema_version: String,
    pub task: String,
    pub method: String,
    pub space: String,
    /// Canonical token string of the best program found.
    pub best_program: Option<String>,
    /// `None` when no program was evaluated.
    pub best_reward: Option<f64>,
    pub evaluations: u64,
    pub searches: usize,
    pub stop: DriverStop,
    /// Every new best, keyed by the evaluation count at which it appeared.
    pub history: Vec<HistoryPoint>,
    pub policy: serde_json::Value,
    pub digest: String,
}

impl RunRecord {
    #[must_use]
    pub fn new(policy: &PolicyConfig, summary: &RunSummary) -> Self {
        let mut record = Self {
            schema_version: "run_record.v1".into(),
            task: policy.task.name().into(),
            method: policy.method.name().into(),
            space: policy.space.name().into(),
            best_program: summary.best_program.as_ref().map(encode),
            best_reward: summary.best_program.as_ref().map(|_| summary.best_reward),
            evaluations: summary.evaluations,
            searches: summary.searches,
            stop: summary.stop,
            history: summary.history.clone(),
            policy: policy.snapshot(),
            digest: String::new(),
        };
        record.digest = record.compute_digest();
        record
    }

    /// Canonical JSON of every field except `digest`.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.remove("digest");
        }
        serde_json::to_vec(&value).unwrap_or_default()
    }

    #[must_use]
    pub fn compute_digest(&self) -> String {
        canonical_hash(HashDomain::RunRecord, &self.body_bytes()).to_string()
    }

    /// Canonical JSON of the whole record.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Io`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, RunError> {
        let value = serde_json::to_value(self).map_err(|e| RunError::Io {
            detail: e.to_string(),
        })?;
        serde_json::to_vec(&value).map_err(|e| RunError::Io {
            detail: e.to_string(),
        })
    }

    /// Write the record into `dir`, creating it if needed. Returns the
    /// record file's path.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Io`] on any filesystem failure.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, RunError> {
        let io = |e: std::io::Error| RunError::Io {
            detail: e.to_string(),
        };
        std::fs::create_dir_all(dir).map_err(io)?;
        let path = dir.join(RECORD_FILENAME);
        std::fs::write(&path, self.to_json_bytes()?).map_err(io)?;
        std::fs::write(dir.join(DIGEST_FILENAME), &self.digest).map_err(io)?;
        Ok(path)
    }

    /// Read a record written by [`RunRecord::write_to_dir`].
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Io`] if a file is missing or unparsable, if the
    /// digest file is not an `algorithm:hex` string for this algorithm, or if
    /// either stored digest disagrees with the recomputed one.
    pub fn read_from_dir(dir: &Path) -> Result<Self, RunError> {
        let io = |detail: String| RunError::Io { detail };
        let bytes = std::fs::read(dir.join(RECORD_FILENAME)).map_err(|e| io(e.to_string()))?;
        let stored = std::fs::read_to_string(dir.join(DIGEST_FILENAME))
            .map_err(|e| io(e.to_string()))?;
        let stored = ContentHash::parse(stored.trim())
            .ok_or_else(|| io(format!("malformed digest {:?}", stored.trim())))?;
        if stored.algorithm() != HASH_ALGORITHM {
            return Err(io(format!("unsupported digest algorithm {}", stored.algorithm())));
        }
        let record: Self = serde_json::from_slice(&bytes).map_err(|e| io(e.to_string()))?;
        let recomputed = record.compute_digest();
        if record.digest != recomputed || stored.as_str() != recomputed {
            return Err(io(format!(
                "digest mismatch: stored {}, recomputed {recomputed}",
                stored.short(12)
            )));
        }
        Ok(record)
    }
}
