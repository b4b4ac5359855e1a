//! Per-attempt and global time budgets.

use crate::{DbEnumError, Result};
use std::time::Duration;

/// Time limits applied to a run.
///
/// `per_attempt` bounds each adapter call; `global` bounds the whole run.
/// An attempt never gets more than what is left of the global budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeBudget {
    pub per_attempt: Duration,
    pub global: Duration,
}

impl Default for ProbeBudget {
    fn default() -> Self {
        Self::from_secs(15, 60)
    }
}

impl ProbeBudget {
    /// Creates a budget from whole seconds, as given on the command line.
    pub const fn from_secs(per_attempt: u64, global: u64) -> Self {
        Self {
            per_attempt: Duration::from_secs(per_attempt),
            global: Duration::from_secs(global),
        }
    }

    /// Validates the budget.
    ///
    /// # Errors
    /// Returns error if either limit is zero
    pub fn validate(&self) -> Result<()> {
        if self.per_attempt.is_zero() {
            return Err(DbEnumError::configuration(
                "timeout must be greater than 0",
            ));
        }
        if self.global.is_zero() {
            return Err(DbEnumError::configuration(
                "global timeout must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Deadline for the next call given what is left of the global budget.
    pub fn attempt_timeout(&self, remaining: Duration) -> Duration {
        self.per_attempt.min(remaining)
    }
}
