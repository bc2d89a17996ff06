//! Scraping service module
//!
//! This module is the boundary to the remote scraping API:
//! - `ScrapeService`: the submit/poll seam the crawl client drives
//! - `FirecrawlService`: the HTTP implementation of that seam
//! - Classification of service failures into rate-limit, transient and
//!   permanent kinds
//!
//! Neither operation retries or sleeps. Each call is exactly one round trip;
//! retry policy lives in the crawler.

mod http;
mod wire;

pub use http::{build_http_client, FirecrawlService};
pub use wire::{StatusResponse, SubmitBody, SubmitResponse, WireScrapeOptions};

use crate::job::{CrawlRequest, JobHandle, JobStatus, PageDocument};
use crate::retry::ErrorClass;
use async_trait::async_trait;
use thiserror::Error;

/// Marker the service puts in its error text when the quota is exhausted
pub const RATE_LIMIT_MARKER: &str = "rate limit exceeded";

/// Submit and poll operations of an asynchronous scraping service
#[async_trait]
pub trait ScrapeService: Send + Sync {
    /// Submits one crawl job
    ///
    /// # Returns
    ///
    /// * `Ok(JobHandle)` - The service accepted the job
    /// * `Err(SubmissionError)` - The submission failed, classified
    async fn submit(&self, request: &CrawlRequest) -> Result<JobHandle, SubmissionError>;

    /// Queries the status of a submitted job once
    ///
    /// # Returns
    ///
    /// * `Ok(PollOutcome)` - The job is still running or has completed
    /// * `Err(PollError)` - The job failed or the status query itself failed
    async fn poll(&self, handle: &JobHandle) -> Result<PollOutcome, PollError>;
}

/// Non-failing result of a single poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The job is still running
    Scraping,
    /// The job finished; carries the first page result
    Completed(PageDocument),
}

impl PollOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Scraping => JobStatus::Scraping,
            Self::Completed(_) => JobStatus::Completed,
        }
    }
}

/// Submission failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// The service reported an exhausted rate quota
    #[error("rate limit exceeded: {message}")]
    RateLimited { message: String },

    /// Any other failure; an ordinary retry may succeed
    #[error("submission failed: {message}")]
    Transient { message: String },
}

impl SubmissionError {
    /// Classifies a failed submission
    ///
    /// HTTP 429 is the structured signal; the marker text in the error body
    /// carries the same meaning for services that answer 200 with
    /// `success: false`.
    pub fn classify(http_status: Option<u16>, message: String) -> Self {
        if http_status == Some(429) || is_rate_limit_message(&message) {
            Self::RateLimited { message }
        } else {
            Self::Transient { message }
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimited { .. } => ErrorClass::RateLimited,
            Self::Transient { .. } => ErrorClass::Transient,
        }
    }

    /// Raw error text reported by the service or transport
    pub fn message(&self) -> &str {
        match self {
            Self::RateLimited { message } | Self::Transient { message } => message,
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            Self::RateLimited { .. } => JobStatus::FailedRateLimited,
            Self::Transient { .. } => JobStatus::FailedTransient,
        }
    }
}

/// Poll failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError {
    /// The job reached a status other than completed
    #[error("job ended with status '{status}': {message}")]
    Terminal { status: String, message: String },

    /// The job completed but returned no page content
    #[error("job completed without page content")]
    MissingContent,

    /// The status query was rejected for exceeding the rate quota
    #[error("poll rate limited: {message}")]
    RateLimited { message: String },

    /// The status query failed; the job itself may still be running
    #[error("poll failed: {message}")]
    Transient { message: String },
}

impl PollError {
    /// Retry class, or None if the job is gone for good
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::RateLimited { .. } => Some(ErrorClass::RateLimited),
            Self::Transient { .. } => Some(ErrorClass::Transient),
            Self::Terminal { .. } | Self::MissingContent => None,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.class().is_none()
    }

    pub fn status(&self) -> JobStatus {
        match self {
            Self::RateLimited { .. } => JobStatus::FailedRateLimited,
            Self::Transient { .. } => JobStatus::FailedTransient,
            Self::Terminal { .. } | Self::MissingContent => JobStatus::FailedPermanent,
        }
    }
}

/// Returns true if the error text signals an exhausted rate quota
pub fn is_rate_limit_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains(RATE_LIMIT_MARKER)
}
