//! Run statistics for crawl operations
//!
//! Counters are shared by every operation of a batch and updated without
//! locking. A [`StatsSnapshot`] is a plain copy for reporting.

use crate::retry::ErrorClass;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live event counters
#[derive(Debug, Default)]
pub struct CrawlStats {
    submissions: AtomicU64,
    polls: AtomicU64,
    completed: AtomicU64,
    transient_errors: AtomicU64,
    rate_limited: AtomicU64,
    permanent_failures: AtomicU64,
    exhausted: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Submission requests sent
    pub submissions: u64,
    /// Status queries sent
    pub polls: u64,
    /// Jobs that returned content
    pub completed: u64,
    /// Transient submission or poll failures
    pub transient_errors: u64,
    /// Rate-limit events
    pub rate_limited: u64,
    /// Jobs that ended in a non-completed status
    pub permanent_failures: u64,
    /// Operations abandoned after hitting a retry ceiling
    pub exhausted: u64,
    /// Operations stopped by cancellation
    pub cancelled: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submission(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a retryable failure under its class
    pub fn record_failure(&self, class: ErrorClass) {
        let counter = match class {
            ErrorClass::Transient => &self.transient_errors,
            ErrorClass::RateLimited => &self.rate_limited,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permanent_failure(&self) {
        self.permanent_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submissions: self.submissions.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            transient_errors: self.transient_errors.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            permanent_failures: self.permanent_failures.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Operations that ended without content
    pub fn failed(&self) -> u64 {
        self.permanent_failures + self.exhausted + self.cancelled
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Crawl Statistics ===")?;
        writeln!(f, "Submissions:        {}", self.submissions)?;
        writeln!(f, "Polls:              {}", self.polls)?;
        writeln!(f, "Completed:          {}", self.completed)?;
        writeln!(f, "Transient errors:   {}", self.transient_errors)?;
        writeln!(f, "Rate-limit events:  {}", self.rate_limited)?;
        writeln!(f, "Permanent failures: {}", self.permanent_failures)?;
        writeln!(f, "Retries exhausted:  {}", self.exhausted)?;
        write!(f, "Cancelled:          {}", self.cancelled)
    }
}
