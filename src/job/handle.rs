use std::fmt;
use url::Url;

/// Opaque reference to a job in flight on the scraping service
///
/// Holds the poll URL the service returned at submission time. A handle is
/// owned by the crawl operation that submitted the job and is dropped once the
/// job reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    poll_url: Url,
}

impl JobHandle {
    pub fn new(poll_url: Url) -> Self {
        Self { poll_url }
    }

    /// Builds a handle from a submission response
    ///
    /// The poll URL wins over the job id. When only an id is returned the poll
    /// URL is `<endpoint>/<id>`. Either way the poll URL takes the endpoint's
    /// scheme: self-hosted services behind plain HTTP still answer with
    /// `https://` poll URLs.
    ///
    /// Returns None if neither field yields a usable URL.
    pub fn from_submission(poll_url: Option<&str>, id: Option<&str>, endpoint: &Url) -> Option<Self> {
        let url = match (poll_url, id) {
            (Some(raw), _) if !raw.trim().is_empty() => Url::parse(raw.trim()).ok()?,
            (_, Some(id)) if !id.trim().is_empty() => {
                let base = endpoint.as_str().trim_end_matches('/');
                Url::parse(&format!("{}/{}", base, id.trim())).ok()?
            }
            _ => return None,
        };

        Some(Self::new(align_scheme(url, endpoint)))
    }

    /// The URL status queries are sent to
    pub fn poll_url(&self) -> &Url {
        &self.poll_url
    }

    /// Last path segment of the poll URL, which is the job id for Firecrawl
    pub fn job_id(&self) -> Option<&str> {
        self.poll_url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.poll_url.as_str())
    }
}

/// Rewrites `url` to use the scheme of `endpoint`
fn align_scheme(mut url: Url, endpoint: &Url) -> Url {
    if url.scheme() != endpoint.scheme() {
        // Only fails across special/non-special schemes; keep the original then
        let _ = url.set_scheme(endpoint.scheme());
    }
    url
}
