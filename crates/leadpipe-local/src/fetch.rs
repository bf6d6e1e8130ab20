use leadpipe_core::{Error, LeadQuery, Result, SearchBackend};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, COOKIE};
use std::time::{Duration, Instant};

const SEARCH_ENDPOINT: &str = "https://www.google.com/search";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Engine-side cap; bounds the downstream batch count to at most 5 batches.
const MAX_RESULTS: usize = 50;

/// Scrapes one page of Google web-search results over plain HTTP.
///
/// Sends browser-identifying headers and a consent cookie so the engine serves
/// the results page rather than an interstitial. One GET per query; no paging.
#[derive(Debug, Clone)]
pub struct GoogleSearchBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleSearchBackend {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(SEARCH_ENDPOINT.to_string())
    }

    /// Point the backend at a different endpoint (fixture servers in tests).
    pub fn with_endpoint(endpoint: String) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    fn looks_blocked(html: &str) -> bool {
        // The engine's CAPTCHA/consent interstitials are short pages with
        // recognizable markers; real result pages do not carry them.
        let lower = html.to_ascii_lowercase();
        lower.contains("g-recaptcha")
            || lower.contains("unusual traffic from your computer network")
            || lower.contains("consent.google.com")
    }
}

#[async_trait::async_trait]
impl SearchBackend for GoogleSearchBackend {
    async fn fetch_results(&self, query: &LeadQuery) -> Result<String> {
        let terms = query.search_terms();
        let num = query.max_results.unwrap_or(MAX_RESULTS).min(MAX_RESULTS);
        let t0 = Instant::now();

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", terms.as_str()), ("num", num.to_string().as_str())])
            .header(COOKIE, "CONSENT=YES+1")
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("search HTTP {status}")));
        }
        let body = resp.text().await.map_err(|e| Error::Fetch(e.to_string()))?;
        if Self::looks_blocked(&body) {
            return Err(Error::Blocked(
                "engine served an interstitial page instead of results".to_string(),
            ));
        }

        tracing::debug!(
            query = %terms,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "search fetch complete"
        );
        Ok(body)
    }
}
