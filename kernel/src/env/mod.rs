//! Environment contract consumed by the interpreter.
//!
//! The kernel never owns a concrete grid world. It drives anything that
//! implements [`Environment`]: named actions that may crash the run, named
//! boolean perceptions, a crash flag, and a call budget that force-crashes
//! the run once exhausted. Crashing is a terminal flag observed after each
//! step, never an error.
//!
//! Environments are value types: a task clones its canonical initial
//! environment for every rollout, so the `Clone` bound is the fresh-clone
//! operation.

/// Default ceiling on action plus perception calls per rollout.
pub const DEFAULT_MAX_CALLS: u64 = 10_000;

/// A grid world the interpreter can drive.
pub trait Environment: Clone {
    /// Execute a zero-argument action. Unknown names crash the run.
    fn perform(&mut self, action: &str);

    /// Evaluate a boolean perception. Must not change the world state other
    /// than charging the call budget. Unknown names evaluate to `false`.
    fn perceive(&mut self, perception: &str, params: &[String]) -> bool;

    /// `true` once the run is over (illegal move or exhausted budget).
    fn is_crashed(&self) -> bool;

    /// Calls charged so far.
    fn calls(&self) -> u64;

    /// Compact description of the agent's surroundings, for trace records.
    fn partial_state(&self) -> String {
        String::new()
    }
}

/// Per-rollout call counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBudget {
    used: u64,
    max: u64,
}

impl CallBudget {
    #[must_use]
    pub fn new(max: u64) -> Self {
        Self { used: 0, max }
    }

    /// Record one call. Returns `true` if the budget is now exceeded.
    pub fn charge(&mut self) -> bool {
        self.used = self.used.saturating_add(1);
        self.used > self.max
    }

    #[must_use]
    pub fn used(&self) -> u64 {
        self.used
    }

    #[must_use]
    pub fn max(&self) -> u64 {
        self.max
    }
}

impl Default for CallBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALLS)
    }
}
