//! Single-URL crawl orchestration
//!
//! Drives one request through the job lifecycle:
//!
//! ```text
//! Init -> Submitting -> Submitted -> Polling -> (Scraping -> Polling)* -> Completed
//!             ^   |                     |   ^
//!             |   +-- RateLimited ------+   +-- poll RateLimited / Transient (same handle)
//!             +------ Transient             +-> PermanentError (terminal)
//! ```
//!
//! Submission failures lead to a new submission once the backoff delay has
//! passed. Retryable poll failures re-poll the same handle; a new job is
//! never submitted while one is live.

use crate::config::Config;
use crate::crawler::{CrawlError, CrawlStats};
use crate::job::{CrawlRequest, CrawlResult, JobHandle, JobStatus};
use crate::retry::{Backoff, BackoffPolicy, ErrorClass, RetryState};
use crate::service::{FirecrawlService, PollError, PollOutcome, ScrapeService};
use crate::EmberError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Crawls single URLs against a scraping service
pub struct CrawlClient<S> {
    service: Arc<S>,
    policy: BackoffPolicy,
    poll_interval: Duration,
    stats: Arc<CrawlStats>,
}

impl<S> Clone for CrawlClient<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            policy: self.policy.clone(),
            poll_interval: self.poll_interval,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl CrawlClient<FirecrawlService> {
    /// Creates a client for the configured HTTP service
    pub fn from_config(config: &Config) -> Result<Self, EmberError> {
        let service = FirecrawlService::new(&config.service)?;
        Ok(Self::new(
            service,
            BackoffPolicy::from(&config.retry),
            Duration::from_millis(config.polling.interval_ms),
        ))
    }
}

impl<S: ScrapeService> CrawlClient<S> {
    pub fn new(service: S, policy: BackoffPolicy, poll_interval: Duration) -> Self {
        Self::from_shared(Arc::new(service), policy, poll_interval)
    }

    /// Creates a client around a service shared with other clients
    pub fn from_shared(service: Arc<S>, policy: BackoffPolicy, poll_interval: Duration) -> Self {
        Self {
            service,
            policy,
            poll_interval,
            stats: Arc::new(CrawlStats::new()),
        }
    }

    /// Reports into an existing set of counters
    pub fn with_stats(mut self, stats: Arc<CrawlStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<CrawlStats> {
        &self.stats
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Crawls one URL to completion
    ///
    /// Retries submission failures per the backoff policy; without a retry
    /// ceiling this only returns once the job completes or fails permanently.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - The job completed and returned content
    /// * `Err(CrawlError)` - Permanent job failure or exhausted retries
    pub async fn crawl(&self, request: CrawlRequest) -> Result<CrawlResult, CrawlError> {
        self.crawl_with_cancel(request, &CancellationToken::new()).await
    }

    /// Crawls one URL, stopping early when `cancel` fires
    ///
    /// Cancellation interrupts any backoff or poll wait as well as an
    /// in-flight request and yields `CrawlError::Cancelled`.
    pub async fn crawl_with_cancel(
        &self,
        request: CrawlRequest,
        cancel: &CancellationToken,
    ) -> Result<CrawlResult, CrawlError> {
        let span = tracing::info_span!("crawl", url = %request.label());
        self.run(request, cancel).instrument(span).await
    }

    async fn run(
        &self,
        request: CrawlRequest,
        cancel: &CancellationToken,
    ) -> Result<CrawlResult, CrawlError> {
        let url = request.url().to_string();
        let mut retry = RetryState::new();

        // Submitting: loops until the service hands out a poll reference
        let handle = loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(&url));
            }

            let submitted = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(&url)),
                submitted = self.service.submit(&request) => submitted,
            };
            self.stats.record_submission();

            match submitted {
                Ok(handle) => {
                    tracing::info!(
                        status = %JobStatus::Submitted,
                        poll_url = %handle,
                        "Submitted: {}",
                        request.label()
                    );
                    break handle;
                }
                Err(e) => {
                    self.back_off(&mut retry, e.class(), "submit", e.message(), &url, cancel)
                        .await?;
                }
            }
        };

        self.poll_until_done(request, handle, &mut retry, cancel).await
    }

    /// Polling: one status query at a time until the job is terminal
    async fn poll_until_done(
        &self,
        request: CrawlRequest,
        handle: JobHandle,
        retry: &mut RetryState,
        cancel: &CancellationToken,
    ) -> Result<CrawlResult, CrawlError> {
        let url = request.url().to_string();

        loop {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(&url)),
                polled = self.service.poll(&handle) => polled,
            };
            self.stats.record_poll();

            match polled {
                Ok(PollOutcome::Scraping) => {
                    tracing::info!(
                        status = %JobStatus::Scraping,
                        "Scraping: {}, polling again in {:?}",
                        request.label(),
                        self.poll_interval
                    );
                    self.pause(self.poll_interval, &url, cancel).await?;
                }
                Ok(PollOutcome::Completed(document)) => {
                    return match CrawlResult::from_document(request, document) {
                        Some(result) => {
                            self.stats.record_completed();
                            tracing::info!(
                                status = %JobStatus::Completed,
                                bytes = result.content().len(),
                                "Completed: {}",
                                result.request().label()
                            );
                            Ok(result)
                        }
                        None => Err(self.permanent(url, PollError::MissingContent)),
                    };
                }
                Err(e) => match e.class() {
                    Some(class) => {
                        let message = e.to_string();
                        self.back_off(retry, class, "poll", &message, &url, cancel)
                            .await?;
                    }
                    None => return Err(self.permanent(url, e)),
                },
            }
        }
    }

    /// Consults the policy after a retryable failure and waits if told to
    async fn back_off(
        &self,
        retry: &mut RetryState,
        class: ErrorClass,
        stage: &'static str,
        message: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), CrawlError> {
        self.stats.record_failure(class);

        match retry.on_failure(class, &self.policy, Instant::now()) {
            Backoff::Wait(delay) => {
                match class {
                    ErrorClass::RateLimited => tracing::warn!(
                        event = "rate_limited",
                        stage,
                        attempt = retry.failures(class),
                        "Rate limit exceeded ({}), cooling down for {:?}",
                        message,
                        delay
                    ),
                    ErrorClass::Transient => tracing::warn!(
                        event = "transient",
                        stage,
                        attempt = retry.failures(class),
                        "{}, retrying in {:?}",
                        message,
                        delay
                    ),
                }
                self.pause(delay, url, cancel).await
            }
            Backoff::GiveUp => {
                let attempts = retry.failures(class);
                self.stats.record_exhausted();
                tracing::error!(stage, %class, attempts, "Giving up: {}", message);
                Err(CrawlError::Exhausted {
                    url: url.to_string(),
                    class,
                    attempts,
                    message: message.to_string(),
                })
            }
        }
    }

    /// Sleeps unless cancelled first
    async fn pause(
        &self,
        delay: Duration,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), CrawlError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(self.cancelled(url)),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn permanent(&self, url: String, source: PollError) -> CrawlError {
        self.stats.record_permanent_failure();
        tracing::error!(status = %source.status(), "Permanent failure: {}", source);
        CrawlError::Permanent { url, source }
    }

    fn cancelled(&self, url: &str) -> CrawlError {
        self.stats.record_cancelled();
        tracing::info!("Cancelled");
        CrawlError::Cancelled {
            url: url.to_string(),
        }
    }
}
