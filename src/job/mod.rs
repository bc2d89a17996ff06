//! Job module: the values that flow through a crawl
//!
//! # Components
//!
//! - `CrawlRequest` / `ScrapeOptions`: what to crawl and how the service should render it
//! - `JobHandle`: the poll reference returned by the service
//! - `JobStatus`: where a job is in its lifecycle
//! - `CrawlResult` / `PageDocument`: the extracted page handed back to the caller

mod document;
mod handle;
mod request;
mod status;

// Re-export main types
pub use document::{CrawlResult, PageDocument};
pub use handle::JobHandle;
pub use request::{CrawlRequest, ScrapeFormat, ScrapeOptions};
pub use status::JobStatus;

use url::Url;

/// Returns the URL without its scheme, for log lines
///
/// `https://www.who.int/data` becomes `www.who.int/data`.
pub fn url_label(url: &Url) -> &str {
    let raw = url.as_str();
    raw.split_once("://").map(|(_, rest)| rest).unwrap_or(raw)
}
