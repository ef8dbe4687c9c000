//! Retry/backoff decisions, grounded in the host's closed `FailoverAction`
//! enum shape — a decision enum rather than a bare boolean, so the
//! executor's retry loop reads as a match rather than nested conditionals.

use recipe_core::RetryPolicy;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Attempt again after sleeping `delay`.
    RetryAfter { delay: Duration },
    /// Attempts exhausted; surface the failure.
    GiveUp,
}

/// Decide what happens after attempt `attempt` (1-indexed) of `policy` has
/// failed. Exponential backoff: `delay = 2^(attempt-1) * backoff_factor`
/// seconds, matching the host's doubling-per-retry convention.
pub fn decide_retry(attempt: u32, policy: &RetryPolicy) -> RetryDecision {
    if attempt >= policy.max_attempts {
        return RetryDecision::GiveUp;
    }
    let backoff_secs = policy.backoff_factor * 2f64.powi(attempt as i32 - 1);
    RetryDecision::RetryAfter {
        delay: Duration::from_secs_f64(backoff_secs.max(0.0)),
    }
}
