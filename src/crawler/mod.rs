//! Crawler module for driving crawl jobs to completion
//!
//! This module contains the orchestration on top of the scraping service:
//! - Single-URL submit/poll/backoff state machine
//! - Concurrent, order-preserving batches over one connection pool
//! - Sequential runs with spacing between jobs
//! - Run statistics

mod batch;
mod client;
mod stats;

pub use batch::{BatchRunner, SiblingPolicy};
pub use client::CrawlClient;
pub use stats::{CrawlStats, StatsSnapshot};

use crate::retry::ErrorClass;
use crate::service::PollError;
use thiserror::Error;

/// Ways a crawl operation can end without content
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The job reached a terminal status other than completed
    #[error("crawl of {url} failed permanently: {source}")]
    Permanent {
        url: String,
        #[source]
        source: PollError,
    },

    /// A retry ceiling was reached
    #[error("crawl of {url} gave up after {attempts} {class} failures: {message}")]
    Exhausted {
        url: String,
        class: ErrorClass,
        attempts: u32,
        message: String,
    },

    /// The caller cancelled the operation
    #[error("crawl of {url} cancelled")]
    Cancelled { url: String },
}

impl CrawlError {
    /// The URL whose crawl failed
    pub fn url(&self) -> &str {
        match self {
            Self::Permanent { url, .. } | Self::Exhausted { url, .. } | Self::Cancelled { url } => url,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
