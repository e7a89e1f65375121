//! Gridsynth Harness: grid tasks and end-to-end synthesis runs.
//!
//! The harness turns Karel task instances into search rewards and runs a
//! configured search over them, packaging the result as a run record.
//!
//! The harness does NOT implement search or execution. It delegates to the
//! search crate and the kernel. Worlds provide environments and step
//! rewards only; the harness owns orchestration.
//!
//! - [`runner::run`]: policy in, [`record::RunRecord`] out
//! - [`runner::EpisodeRunner`]: the three evaluation modes of a task
//! - [`transcript::transcribe`]: record-mode replay of a program as JSON

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod contract;
pub mod policy;
pub mod record;
pub mod runner;
pub mod transcript;
pub mod worlds;
