//! Program execution against an [`Environment`](crate::env::Environment).
//!
//! - [`interpreter`]: the suspension-based stepper
//! - [`trace`]: record-mode trace log types
//! - [`credit`]: per-node credit assignment over executed actions

pub mod credit;
pub mod interpreter;
pub mod trace;

pub use credit::NodeCredit;
pub use interpreter::{ActionStep, ExecError, ExecEvent, Execution, PerceptionStep};
pub use trace::{StepKind, StepRecord, TraceLog};
