//! Gridsynth Search: local search over grid-world programs.
//!
//! This crate provides the search layer. It depends only on
//! `gridsynth_kernel`; it does NOT depend on `gridsynth_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! gridsynth_kernel  ←  gridsynth_search  ←  gridsynth_harness
//! (dsl, env, exec)     (spaces, methods)     (worlds, tasks, runner)
//! ```
//!
//! # Key types
//!
//! - [`SearchSpace`]: neighborhood structure with encode/decode
//! - [`ProgrammaticSpace`] and [`LatentSpace`]: its two realizations
//! - [`SearchMethod`]: implemented by [`HillClimbing`], [`ScheduledHillClimbing`] and [`Cebs`]
//! - [`RewardFn`] and [`Task`]: what a search maximizes
//! - [`run_restarts`]: budgeted restart loop with a best-so-far history

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cebs;
pub mod contract;
pub mod driver;
pub mod error;
pub mod generator;
pub mod hill_climbing;
pub mod outcome;
pub mod policy;
pub mod schedule;
pub mod scheduled;
pub mod space;

pub use cebs::Cebs;
pub use contract::{FnReward, RewardFn, Task, TaskSetReward};
pub use driver::{run_restarts, DriverConfig, DriverStop, HistoryPoint, RunSummary};
pub use error::{EncodeFailure, SearchError};
pub use hill_climbing::HillClimbing;
pub use outcome::{SearchMethod, SearchOutcome, TerminationReason};
pub use scheduled::ScheduledHillClimbing;
pub use space::{LatentSpace, ProgrammaticSpace, SearchSpace};
