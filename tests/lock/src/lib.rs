//! Shared fixtures for the acceptance tests.

pub mod fixtures;
