//! Batch execution over many crawl requests
//!
//! All operations of a batch are driven from the calling task through a
//! `FuturesUnordered`; they interleave at their request and sleep points and
//! share one HTTP connection pool. Results come back in input order.

use crate::config::Config;
use crate::crawler::{CrawlClient, CrawlError};
use crate::job::{CrawlRequest, CrawlResult};
use crate::service::{FirecrawlService, ScrapeService};
use crate::EmberError;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Fate of the remaining operations once one request in a batch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiblingPolicy {
    /// Cancel and drop every other operation immediately
    #[default]
    Cancel,
    /// Let operations already holding a job run to completion, then discard
    /// their results; queued operations are never started
    Finish,
}

/// Runs batches of crawl requests through one [`CrawlClient`]
pub struct BatchRunner<S> {
    client: CrawlClient<S>,
    sibling_policy: SiblingPolicy,
    max_in_flight: Option<usize>,
    sequential_spacing: Duration,
}

impl BatchRunner<FirecrawlService> {
    /// Creates a runner for the configured HTTP service
    pub fn from_config(config: &Config) -> Result<Self, EmberError> {
        let client = CrawlClient::from_config(config)?;
        let mut runner = Self::new(client)
            .with_sibling_policy(config.batch.on_failure)
            .with_sequential_spacing(Duration::from_millis(config.batch.sequential_spacing_ms));

        if let Some(limit) = config.batch.max_concurrent_jobs {
            runner = runner.with_max_in_flight(limit as usize);
        }

        Ok(runner)
    }
}

impl<S: ScrapeService> BatchRunner<S> {
    pub fn new(client: CrawlClient<S>) -> Self {
        Self {
            client,
            sibling_policy: SiblingPolicy::default(),
            max_in_flight: None,
            sequential_spacing: Duration::ZERO,
        }
    }

    pub fn with_sibling_policy(mut self, policy: SiblingPolicy) -> Self {
        self.sibling_policy = policy;
        self
    }

    /// Caps the number of operations that may hold a live job at once
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit.max(1));
        self
    }

    /// Pause inserted between two jobs by [`BatchRunner::run_sequential`]
    pub fn with_sequential_spacing(mut self, spacing: Duration) -> Self {
        self.sequential_spacing = spacing;
        self
    }

    pub fn client(&self) -> &CrawlClient<S> {
        &self.client
    }

    pub fn sibling_policy(&self) -> SiblingPolicy {
        self.sibling_policy
    }

    /// Crawls every request concurrently
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<CrawlResult>)` - One result per request, in input order
    /// * `Err(CrawlError)` - The first failure observed
    pub async fn run_all(&self, requests: Vec<CrawlRequest>) -> Result<Vec<CrawlResult>, CrawlError> {
        self.run_all_with_cancel(requests, &CancellationToken::new())
            .await
    }

    /// Crawls every request concurrently until done or `cancel` fires
    pub async fn run_all_with_cancel(
        &self,
        requests: Vec<CrawlRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CrawlResult>, CrawlError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let total = requests.len();
        tracing::info!(
            jobs = total,
            max_in_flight = ?self.max_in_flight,
            policy = ?self.sibling_policy,
            "Starting batch"
        );

        // Cancelling the batch never cancels the caller's token
        let batch_cancel = cancel.child_token();
        // Set once the batch has failed; queued operations must not start after it
        let halted = CancellationToken::new();
        let semaphore = self.max_in_flight.map(|limit| Arc::new(Semaphore::new(limit)));

        let mut in_flight = FuturesUnordered::new();
        for (index, request) in requests.into_iter().enumerate() {
            let client = &self.client;
            let token = &batch_cancel;
            let halted = &halted;
            let semaphore = semaphore.clone();

            in_flight.push(async move {
                // A closed semaphore means the batch failed while this one was queued
                let _permit = match semaphore {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return (index, None),
                    },
                    None => None,
                };
                if halted.is_cancelled() {
                    return (index, None);
                }
                (index, Some(client.crawl_with_cancel(request, token).await))
            });
        }

        let mut slots: Vec<Option<CrawlResult>> = (0..total).map(|_| None).collect();
        let mut first_error: Option<CrawlError> = None;

        while let Some((index, outcome)) = in_flight.next().await {
            let Some(outcome) = outcome else {
                tracing::debug!(index, "Skipping queued request after batch failure");
                continue;
            };

            match outcome {
                Ok(result) if first_error.is_none() => slots[index] = Some(result),
                Ok(result) => {
                    tracing::debug!("Discarding result for {}", result.request().label());
                }
                Err(e) if first_error.is_some() => {
                    tracing::debug!("Discarding sibling failure: {}", e);
                }
                Err(e) => match self.sibling_policy {
                    SiblingPolicy::Cancel => {
                        tracing::warn!(
                            remaining = in_flight.len(),
                            "Batch failed, cancelling siblings: {}",
                            e
                        );
                        batch_cancel.cancel();
                        return Err(e);
                    }
                    SiblingPolicy::Finish => {
                        tracing::warn!(
                            remaining = in_flight.len(),
                            "Batch failed, letting in-flight siblings finish: {}",
                            e
                        );
                        halted.cancel();
                        if let Some(semaphore) = &semaphore {
                            semaphore.close();
                        }
                        first_error = Some(e);
                    }
                },
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        tracing::info!(jobs = total, "Batch completed");
        Ok(slots.into_iter().flatten().collect())
    }

    /// Crawls the requests one at a time, in order
    ///
    /// Stops at the first failure; later requests are never submitted.
    pub async fn run_sequential(
        &self,
        requests: Vec<CrawlRequest>,
    ) -> Result<Vec<CrawlResult>, CrawlError> {
        self.run_sequential_with_cancel(requests, &CancellationToken::new())
            .await
    }

    pub async fn run_sequential_with_cancel(
        &self,
        requests: Vec<CrawlRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CrawlResult>, CrawlError> {
        let mut results = Vec::with_capacity(requests.len());

        for (index, request) in requests.into_iter().enumerate() {
            if index > 0 && !self.sequential_spacing.is_zero() {
                tracing::debug!("Waiting {:?} before next job", self.sequential_spacing);
                // A cancelled wait falls through; the crawl below then reports it
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.sequential_spacing) => {}
                }
            }

            results.push(self.client.crawl_with_cancel(request, cancel).await?);
        }

        Ok(results)
    }
}
