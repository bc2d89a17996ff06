use crate::config::RetryConfig;
use std::fmt;
use std::time::Duration;

/// Failure classes the policy distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Flaky network, server hiccup, or any unclassified service error
    Transient,
    /// The service reported an exhausted rate quota
    RateLimited,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::RateLimited => write!(f, "rate_limited"),
        }
    }
}

/// Decision returned by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Wait this long, then try the same stage again
    Wait(Duration),
    /// Abandon the operation
    GiveUp,
}

/// Pure retry policy
///
/// Each class has a fixed delay and an optional ceiling on retries. Without a
/// ceiling the policy never gives up. Attempt numbers are per class, so a run
/// of rate-limit errors does not eat into the transient budget.
///
/// | Class | Delay | Ceiling |
/// |-------|-------|---------|
/// | Transient | `transient_delay` (default 10s) | `max_transient_retries` |
/// | RateLimited | `rate_limit_delay` (default 60s) | `max_rate_limit_retries` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub transient_delay: Duration,
    pub rate_limit_delay: Duration,
    pub max_transient_retries: Option<u32>,
    pub max_rate_limit_retries: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            transient_delay: Duration::from_millis(config.transient_delay_ms),
            rate_limit_delay: Duration::from_millis(config.rate_limit_delay_ms),
            max_transient_retries: config.max_transient_retries,
            max_rate_limit_retries: config.max_rate_limit_retries,
        }
    }
}

impl BackoffPolicy {
    /// Decides what to do after the `attempt`-th failure of `class`
    ///
    /// `attempt` is 1 for the first failure of that class. With a ceiling of
    /// `n`, failures `1..=n` wait and failure `n + 1` gives up.
    ///
    /// # Example
    ///
    /// ```
    /// use ember_poll::retry::{Backoff, BackoffPolicy, ErrorClass};
    /// use std::time::Duration;
    ///
    /// let policy = BackoffPolicy::default().with_max_transient_retries(2);
    /// assert_eq!(
    ///     policy.next_delay(ErrorClass::Transient, 2),
    ///     Backoff::Wait(Duration::from_secs(10))
    /// );
    /// assert_eq!(policy.next_delay(ErrorClass::Transient, 3), Backoff::GiveUp);
    /// ```
    pub fn next_delay(&self, class: ErrorClass, attempt: u32) -> Backoff {
        let (delay, ceiling) = match class {
            ErrorClass::Transient => (self.transient_delay, self.max_transient_retries),
            ErrorClass::RateLimited => (self.rate_limit_delay, self.max_rate_limit_retries),
        };

        match ceiling {
            Some(max) if attempt > max => Backoff::GiveUp,
            _ => Backoff::Wait(delay),
        }
    }

    pub fn with_max_transient_retries(mut self, max: u32) -> Self {
        self.max_transient_retries = Some(max);
        self
    }

    pub fn with_max_rate_limit_retries(mut self, max: u32) -> Self {
        self.max_rate_limit_retries = Some(max);
        self
    }

    /// Returns true if neither class has a retry ceiling
    pub fn is_unbounded(&self) -> bool {
        self.max_transient_retries.is_none() && self.max_rate_limit_retries.is_none()
    }
}
