/// Job status definitions for tracking a crawl job through its lifecycle
///
/// Transitions are driven by service responses only. The client maps raw
/// failures onto one of the `Failed*` variants and never invents progress.
use std::fmt;

/// Represents the current state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    // ===== Active States =====
    /// The service accepted the job and returned a poll handle
    Submitted,

    /// The service reports the job is still running
    Scraping,

    // ===== Terminal Success States =====
    /// The job finished and returned page content
    Completed,

    // ===== Terminal Error States =====
    /// Submission or poll failed for a reason worth a short-delay retry
    FailedTransient,

    /// The service reported an exhausted rate quota
    FailedRateLimited,

    /// The job ended in a status other than completed
    FailedPermanent,
}

impl JobStatus {
    /// Returns true if no further transition can happen for this job
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted | Self::Scraping)
    }

    /// Returns true if the job is still in flight on the service
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Submitted | Self::Scraping)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true for the failures a new submission may recover from
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FailedTransient | Self::FailedRateLimited)
    }

    /// Maps a status string reported by the service
    ///
    /// Anything other than `scraping` or `completed` is a permanent failure.
    pub fn from_service_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "scraping" => Self::Scraping,
            "completed" => Self::Completed,
            _ => Self::FailedPermanent,
        }
    }

    /// Stable lowercase name used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Scraping => "scraping",
            Self::Completed => "completed",
            Self::FailedTransient => "failed_transient",
            Self::FailedRateLimited => "failed_rate_limited",
            Self::FailedPermanent => "failed_permanent",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
