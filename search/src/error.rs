//! Typed search errors.
//!
//! `SearchError` represents pre-flight failures only. Runtime terminations,
//! including "no improving neighbor", are expressed via
//! [`crate::outcome::TerminationReason`] and never fail.

/// Invalid configuration detected before a search starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("invalid search configuration: {detail}")]
    InvalidConfig { detail: String },
    #[error("{method} requires the latent search space")]
    RequiresLatentSpace { method: String },
    #[error("reward needs at least one task instance")]
    EmptyTaskSet,
}

/// A program that a search space cannot represent.
///
/// Recovered by bounded retry and fallback to a fresh individual; never
/// propagated out of a search.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeFailure {
    #[error("program contains a hole at {node}")]
    Incomplete { node: gridsynth_kernel::dsl::NodeId },
    #[error("program needs {needed} genes, latent dimension is {dimension}")]
    TooLarge { needed: usize, dimension: usize },
    #[error("program exceeds the grammar limits: size {size}, depth {depth}, longest sequence {sequence}")]
    ExceedsLimits {
        size: usize,
        depth: usize,
        sequence: usize,
    },
    #[error("program is outside the search space: {detail}")]
    Unrepresentable { detail: String },
}
