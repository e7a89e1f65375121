//! Gridsynth Kernel: the grid-world program language and its interpreter.
//!
//! # API Surface
//!
//! - [`dsl::decode`] / [`dsl::encode`] -- canonical token codec
//! - [`dsl::Ast::validate`] -- structural and vocabulary invariants
//! - [`exec::Execution`] -- stepwise execution, one suspension per action
//! - [`exec::NodeCredit`] -- per-node credit assignment over a rollout
//!
//! # Module Dependency Direction
//!
//! `dsl` ← `exec` → `env`, with `fingerprint` depending on `dsl` only.
//!
//! One-way only. No cycles. `dsl` depends on nothing internal.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod dsl;
pub mod env;
pub mod exec;
pub mod fingerprint;
