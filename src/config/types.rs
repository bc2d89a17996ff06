use crate::crawler::SiblingPolicy;
use crate::job::ScrapeFormat;
use serde::Deserialize;

/// Default Firecrawl crawl endpoint used when neither the file nor the
/// environment names one
pub const DEFAULT_ENDPOINT: &str = "https://api.firecrawl.dev/v1/crawl";

/// Main configuration structure for Ember-Poll
///
/// Every section has defaults, so an empty file (or no file at all, see
/// [`Config::from_env`]) yields a usable configuration once an API key is
/// supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub polling: PollingConfig,
    pub retry: RetryConfig,
    pub scrape: ScrapeConfig,
    pub batch: BatchConfig,
}

/// Remote endpoint and credentials
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Submission endpoint; poll URLs are returned by the service
    pub endpoint: String,

    /// Bearer credential. Usually supplied through `FIRECRAWL_API_KEY`.
    #[serde(rename = "api-key")]
    pub api_key: Option<String>,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Connect timeout (milliseconds)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

// The API key must never end up in logs.
impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish()
    }
}

/// Job polling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between two polls of the same job (milliseconds)
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 10_000 }
    }
}

/// Retry and backoff configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before retrying after a transient failure (milliseconds)
    #[serde(rename = "transient-delay-ms")]
    pub transient_delay_ms: u64,

    /// Cool-down before retrying after the service reports an exhausted
    /// rate quota (milliseconds)
    #[serde(rename = "rate-limit-delay-ms")]
    pub rate_limit_delay_ms: u64,

    /// Maximum transient retries per request; unset retries forever
    #[serde(rename = "max-transient-retries")]
    pub max_transient_retries: Option<u32>,

    /// Maximum rate-limit retries per request; unset retries forever
    #[serde(rename = "max-rate-limit-retries")]
    pub max_rate_limit_retries: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            transient_delay_ms: 10_000,
            rate_limit_delay_ms: 60_000,
            max_transient_retries: None,
            max_rate_limit_retries: None,
        }
    }
}

/// Default scrape options applied to requests built from bare URLs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Representations the service should return
    pub formats: Vec<ScrapeFormat>,

    /// How long the service waits for dynamic content (milliseconds)
    #[serde(rename = "wait-for-ms")]
    pub wait_for_ms: u64,

    /// Strip navigation, headers and footers
    #[serde(rename = "only-main-content")]
    pub only_main_content: bool,

    /// Page limit forwarded to crawl endpoints
    pub limit: Option<u32>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            formats: vec![ScrapeFormat::Html],
            wait_for_ms: 1,
            only_main_content: false,
            limit: None,
        }
    }
}

/// Batch execution configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on in-flight jobs; unset runs every request at once
    #[serde(rename = "max-concurrent-jobs")]
    pub max_concurrent_jobs: Option<u32>,

    /// What happens to the rest of a batch once one request fails
    #[serde(rename = "on-failure")]
    pub on_failure: SiblingPolicy,

    /// Pause between jobs when crawling sequentially (milliseconds)
    #[serde(rename = "sequential-spacing-ms")]
    pub sequential_spacing_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: None,
            on_failure: SiblingPolicy::Cancel,
            sequential_spacing_ms: 0,
        }
    }
}
