//! Ember-Poll: a job-lifecycle client for asynchronous scraping services
//!
//! This crate submits URLs to a Firecrawl-style scraping API, polls the
//! returned job handles until they reach a terminal state, and hands the
//! extracted page back to the caller. Rate-limit and transient failures are
//! classified and retried according to an explicit backoff policy, and many
//! URLs can be crawled concurrently over one shared connection pool.

pub mod config;
pub mod crawler;
pub mod job;
pub mod retry;
pub mod service;

use thiserror::Error;

/// Main error type for Ember-Poll operations
#[derive(Debug, Error)]
pub enum EmberError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] crawler::CrawlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTML selector error: {0}")]
    Selector(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing setting: {0}")]
    Missing(String),
}

/// Result type alias for Ember-Poll operations
pub type Result<T> = std::result::Result<T, EmberError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{BatchRunner, CrawlClient, CrawlError, SiblingPolicy};
pub use job::{CrawlRequest, CrawlResult, JobHandle, JobStatus, ScrapeFormat, ScrapeOptions};
pub use retry::{Backoff, BackoffPolicy, ErrorClass};
pub use service::{FirecrawlService, ScrapeService};
