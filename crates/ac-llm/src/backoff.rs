//! Retry pacing for transport failures on the provider boundary.
//!
//! These retries are internal to the Reasoner's network layer and
//! independent of the pipeline's validation retry counter. Pacing is
//! error-aware: a rate-limit response means the provider asked us to
//! slow down, so it waits one doubling longer than a plain timeout or
//! connection error.

use crate::ProviderError;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NetworkRetryPolicy {
    pub max_retries: u32,
    /// Wait before the first re-send; doubles on every further attempt.
    pub base: Duration,
    /// Upper bound on any single wait.
    pub cap: Duration,
}

impl Default for NetworkRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base: Duration::from_secs(1),
            cap: Duration::from_secs(15),
        }
    }
}

impl NetworkRetryPolicy {
    /// Whether re-send number `attempt` (0-based) is still within budget.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// How long to hold off before re-send number `attempt`, given the
    /// failure that triggered it.
    pub fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let mut doublings = attempt;
        if matches!(error, ProviderError::RateLimited) {
            doublings += 1;
        }
        // Clamp the shift so a corrupt attempt counter cannot overflow.
        self.base
            .saturating_mul(1u32 << doublings.min(16))
            .min(self.cap)
    }
}
