//! HTTP implementation of the scraping service
//!
//! This module handles all requests to the remote API:
//! - Building the shared HTTP client
//! - POSTing crawl jobs with the bearer credential
//! - GETting job status from the returned poll URL
//! - Mapping HTTP status codes and response bodies onto failure classes

use crate::config::ServiceConfig;
use crate::job::{CrawlRequest, JobHandle, JobStatus};
use crate::service::wire::{StatusResponse, SubmitBody, SubmitResponse};
use crate::service::{PollError, PollOutcome, ScrapeService, SubmissionError};
use crate::{ConfigError, EmberError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Longest slice of a response body quoted in an error message
const MAX_BODY_SNIPPET: usize = 300;

/// Builds the HTTP client shared by every crawl operation
///
/// The client owns the connection pool, so one instance should serve a whole
/// batch.
///
/// # Example
///
/// ```no_run
/// use ember_poll::config::ServiceConfig;
/// use ember_poll::service::build_http_client;
///
/// let client = build_http_client(&ServiceConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ServiceConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Firecrawl-style scraping service reached over HTTP
#[derive(Clone)]
pub struct FirecrawlService {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl FirecrawlService {
    /// Creates a service with its own HTTP client
    ///
    /// # Returns
    ///
    /// * `Ok(FirecrawlService)` - Ready to submit jobs
    /// * `Err(EmberError)` - Invalid endpoint, missing key, or client build failure
    pub fn new(config: &ServiceConfig) -> Result<Self, EmberError> {
        let client = build_http_client(config)?;
        Self::with_client(client, config)
    }

    /// Creates a service around an existing HTTP client
    pub fn with_client(client: Client, config: &ServiceConfig) -> Result<Self, EmberError> {
        let endpoint = Url::parse(&config.endpoint)?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::Missing("api-key".to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for FirecrawlService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlService")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ScrapeService for FirecrawlService {
    async fn submit(&self, request: &CrawlRequest) -> Result<JobHandle, SubmissionError> {
        tracing::debug!(url = %request.url(), endpoint = %self.endpoint, "Submitting crawl job");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&SubmitBody::from(request))
            .send()
            .await
            .map_err(|e| SubmissionError::Transient {
                message: describe_transport_error(&e),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubmissionError::Transient {
                message: describe_transport_error(&e),
            })?;

        let parsed = match serde_json::from_str::<SubmitResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) => {
                return Err(SubmissionError::classify(
                    Some(status.as_u16()),
                    format!("HTTP {}: {}", status.as_u16(), snippet(&body)),
                ))
            }
        };

        if !parsed.success {
            let message = parsed
                .error
                .unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), snippet(&body)));
            return Err(SubmissionError::classify(Some(status.as_u16()), message));
        }

        JobHandle::from_submission(parsed.url.as_deref(), parsed.id.as_deref(), &self.endpoint)
            .ok_or_else(|| SubmissionError::Transient {
                message: format!("job accepted without a poll reference: {}", snippet(&body)),
            })
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollOutcome, PollError> {
        let response = self
            .client
            .get(handle.poll_url().clone())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PollError::Transient {
                message: describe_transport_error(&e),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| PollError::Transient {
            message: describe_transport_error(&e),
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PollError::RateLimited {
                message: snippet(&body).to_string(),
            });
        }

        if status.is_server_error() {
            return Err(PollError::Transient {
                message: format!("HTTP {}: {}", status.as_u16(), snippet(&body)),
            });
        }

        // Any other 4xx means the job is unknown to the service
        if status.is_client_error() {
            return Err(PollError::Terminal {
                status: format!("http_{}", status.as_u16()),
                message: snippet(&body).to_string(),
            });
        }

        let parsed: StatusResponse =
            serde_json::from_str(&body).map_err(|e| PollError::Transient {
                message: format!("undecodable status response ({}): {}", e, snippet(&body)),
            })?;

        tracing::trace!(poll_url = %handle, status = %parsed.status, "Polled job status");

        match JobStatus::from_service_status(&parsed.status) {
            JobStatus::Scraping => Ok(PollOutcome::Scraping),
            JobStatus::Completed => parsed
                .data
                .unwrap_or_default()
                .into_iter()
                .next()
                .map(PollOutcome::Completed)
                .ok_or(PollError::MissingContent),
            _ => Err(PollError::Terminal {
                status: parsed.status,
                message: parsed
                    .error
                    .unwrap_or_else(|| "no error reported".to_string()),
            }),
        }
    }
}

/// Describes a transport-level failure
fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timeout: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

/// Returns at most `MAX_BODY_SNIPPET` characters of a body
fn snippet(body: &str) -> &str {
    match body.char_indices().nth(MAX_BODY_SNIPPET) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
