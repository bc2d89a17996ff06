use crate::retry::{Backoff, BackoffPolicy, ErrorClass};
use std::time::{Duration, Instant};

/// Retry bookkeeping for one crawl operation
///
/// Lives exactly as long as the operation for a single request and is
/// dropped when it succeeds or fails for good.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Transient failures seen so far
    pub transient_failures: u32,

    /// Rate-limit failures seen so far
    pub rate_limit_failures: u32,

    /// Classification of the most recent failure
    pub last_error: Option<ErrorClass>,

    /// Earliest moment the next attempt may start
    pub next_attempt_at: Option<Instant>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure and returns its per-class attempt number (1-based)
    pub fn record_failure(&mut self, class: ErrorClass) -> u32 {
        self.last_error = Some(class);
        let counter = match class {
            ErrorClass::Transient => &mut self.transient_failures,
            ErrorClass::RateLimited => &mut self.rate_limit_failures,
        };
        *counter = counter.saturating_add(1);
        *counter
    }

    /// Records a failure and asks the policy what to do next
    ///
    /// On `Backoff::Wait` the next allowed attempt time is set relative to
    /// `now`.
    pub fn on_failure(&mut self, class: ErrorClass, policy: &BackoffPolicy, now: Instant) -> Backoff {
        let attempt = self.record_failure(class);
        let decision = policy.next_delay(class, attempt);

        self.next_attempt_at = match decision {
            Backoff::Wait(delay) => Some(now + delay),
            Backoff::GiveUp => None,
        };

        decision
    }

    /// Failures of a class seen so far
    pub fn failures(&self, class: ErrorClass) -> u32 {
        match class {
            ErrorClass::Transient => self.transient_failures,
            ErrorClass::RateLimited => self.rate_limit_failures,
        }
    }

    /// Time left until the next attempt may start
    pub fn time_until_next_attempt(&self, now: Instant) -> Option<Duration> {
        self.next_attempt_at
            .map(|at| at.saturating_duration_since(now))
            .filter(|d| !d.is_zero())
    }
}
