//! Extracted page content and its hand-off to parsing collaborators
//!
//! A [`CrawlResult`] pairs the page the service returned with the request
//! that produced it. Callers that need to walk the markup can turn it into a
//! `scraper` document; everything beyond that (locating fields, reshaping
//! records) belongs to the caller.

use crate::job::{CrawlRequest, ScrapeFormat};
use crate::EmberError;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::Deserialize;

/// One page result as returned by the scraping service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument {
    pub html: Option<String>,
    pub raw_html: Option<String>,
    pub markdown: Option<String>,
    pub links: Option<Vec<String>>,
    pub screenshot: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl PageDocument {
    /// Picks the textual payload matching the requested formats
    ///
    /// Formats are tried in the order they were requested; if none of them
    /// carries text, html, raw html and markdown are tried in that order.
    pub fn content_for(&self, formats: &[ScrapeFormat]) -> Option<&str> {
        let fallback = [ScrapeFormat::Html, ScrapeFormat::RawHtml, ScrapeFormat::Markdown];

        formats
            .iter()
            .chain(fallback.iter())
            .find_map(|format| self.text(*format))
    }

    fn text(&self, format: ScrapeFormat) -> Option<&str> {
        let value = match format {
            ScrapeFormat::Html => self.html.as_deref(),
            ScrapeFormat::RawHtml => self.raw_html.as_deref(),
            ScrapeFormat::Markdown => self.markdown.as_deref(),
            ScrapeFormat::Links | ScrapeFormat::Screenshot => None,
        };
        value.filter(|s| !s.is_empty())
    }

    /// Source URL reported in the page metadata, if any
    pub fn source_url(&self) -> Option<&str> {
        self.metadata
            .get("sourceURL")
            .or_else(|| self.metadata.get("url"))
            .and_then(|v| v.as_str())
    }
}

/// The extracted payload of a completed crawl job
#[derive(Debug, Clone)]
pub struct CrawlResult {
    request: CrawlRequest,
    content: String,
    document: PageDocument,
    completed_at: DateTime<Utc>,
}

impl CrawlResult {
    /// Builds a result from the first page of a completed job
    ///
    /// Returns None if the page carries no textual content for any format.
    pub fn from_document(request: CrawlRequest, document: PageDocument) -> Option<Self> {
        let content = document.content_for(&request.options().formats)?.to_string();
        Some(Self {
            request,
            content,
            document,
            completed_at: Utc::now(),
        })
    }

    /// The request this result answers
    pub fn request(&self) -> &CrawlRequest {
        &self.request
    }

    /// Raw page content in the preferred requested format
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Every representation the service returned
    pub fn document(&self) -> &PageDocument {
        &self.document
    }

    /// When the job was observed completing
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn into_content(self) -> String {
        self.content
    }

    /// Parses the content as an HTML document
    pub fn parse(&self) -> Html {
        Html::parse_document(&self.content)
    }

    /// Extracts the page title (from the <title> tag)
    pub fn title(&self) -> Option<String> {
        let document = self.parse();
        let title_selector = Selector::parse("title").ok()?;

        document
            .select(&title_selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Returns the trimmed text of every element matching a CSS selector
    ///
    /// # Example
    ///
    /// ```
    /// use ember_poll::job::{CrawlRequest, CrawlResult, PageDocument};
    ///
    /// let request = CrawlRequest::new("https://example.com/").unwrap();
    /// let document = PageDocument {
    ///     html: Some("<div class='update'> Rising </div>".to_string()),
    ///     ..Default::default()
    /// };
    /// let result = CrawlResult::from_document(request, document).unwrap();
    /// assert_eq!(result.select_text("div.update").unwrap(), vec!["Rising"]);
    /// ```
    pub fn select_text(&self, css: &str) -> Result<Vec<String>, EmberError> {
        let selector =
            Selector::parse(css).map_err(|e| EmberError::Selector(format!("{}: {:?}", css, e)))?;
        let document = self.parse();

        Ok(document
            .select(&selector)
            .map(|element| element.text().collect::<String>().trim().to_string())
            .collect())
    }
}
