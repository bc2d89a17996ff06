//! Request and response bodies exchanged with the scraping service

use crate::job::{CrawlRequest, PageDocument, ScrapeFormat};
use serde::{Deserialize, Serialize};

/// Body of a submission request
#[derive(Debug, Serialize)]
pub struct SubmitBody<'a> {
    pub url: &'a str,
    #[serde(rename = "scrapeOptions")]
    pub scrape_options: WireScrapeOptions<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireScrapeOptions<'a> {
    pub formats: &'a [ScrapeFormat],
    /// Milliseconds
    pub wait_for: u64,
    pub only_main_content: bool,
}

impl<'a> From<&'a CrawlRequest> for SubmitBody<'a> {
    fn from(request: &'a CrawlRequest) -> Self {
        let options = request.options();
        Self {
            url: request.url().as_str(),
            scrape_options: WireScrapeOptions {
                formats: &options.formats,
                // Saturates rather than wrapping for absurdly long waits
                wait_for: u64::try_from(options.wait_for.as_millis()).unwrap_or(u64::MAX),
                only_main_content: options.only_main_content,
            },
            limit: options.limit,
        }
    }
}

/// Response to a submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: bool,
    pub url: Option<String>,
    pub id: Option<String>,
    #[serde(default, deserialize_with = "error_text")]
    pub error: Option<String>,
}

/// Response to a status query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Option<Vec<PageDocument>>,
    #[serde(default, deserialize_with = "error_text")]
    pub error: Option<String>,
}

/// Accepts an error given as a string or as any other JSON value
fn error_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
