//! Crawl requests and the scrape options sent with them

use crate::config::ScrapeConfig;
use crate::job::url_label;
use crate::EmberError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Page representations the scraping service can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrapeFormat {
    Markdown,
    Html,
    RawHtml,
    Links,
    Screenshot,
}

impl ScrapeFormat {
    /// Wire name of the format
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::RawHtml => "rawHtml",
            Self::Links => "links",
            Self::Screenshot => "screenshot",
        }
    }
}

impl fmt::Display for ScrapeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options forwarded to the service with every submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeOptions {
    /// Requested representations, in order of preference
    pub formats: Vec<ScrapeFormat>,

    /// How long the service waits for dynamic content before capturing
    pub wait_for: Duration,

    /// Return only the main content of the page
    pub only_main_content: bool,

    /// Page limit for crawl endpoints
    pub limit: Option<u32>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            formats: vec![ScrapeFormat::Html],
            wait_for: Duration::from_millis(1),
            only_main_content: false,
            limit: None,
        }
    }
}

impl From<&ScrapeConfig> for ScrapeOptions {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            formats: config.formats.clone(),
            wait_for: Duration::from_millis(config.wait_for_ms),
            only_main_content: config.only_main_content,
            limit: config.limit,
        }
    }
}

/// An immutable request to crawl one URL
///
/// # Example
///
/// ```
/// use ember_poll::job::{CrawlRequest, ScrapeFormat, ScrapeOptions};
///
/// let request = CrawlRequest::new("https://www.who.int/data").unwrap();
/// assert_eq!(request.label(), "www.who.int/data");
/// assert_eq!(request.options().formats, vec![ScrapeFormat::Html]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    url: Url,
    options: ScrapeOptions,
}

impl CrawlRequest {
    /// Creates a request with default scrape options
    pub fn new(url: &str) -> Result<Self, EmberError> {
        Self::with_options(url, ScrapeOptions::default())
    }

    /// Creates a request with explicit scrape options
    pub fn with_options(url: &str, options: ScrapeOptions) -> Result<Self, EmberError> {
        let url = Url::parse(url.trim())?;
        Ok(Self { url, options })
    }

    /// Creates a request using the configured default options
    pub fn from_config(url: &str, config: &ScrapeConfig) -> Result<Self, EmberError> {
        Self::with_options(url, ScrapeOptions::from(config))
    }

    /// The target URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Scheme-less form of the URL used in log lines
    pub fn label(&self) -> &str {
        url_label(&self.url)
    }
}

impl fmt::Display for CrawlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
