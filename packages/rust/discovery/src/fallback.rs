//! Fallback search provider: an HTML results engine.
//!
//! Used when the primary API is unconfigured or came up short. One request
//! per keyword; result anchors are extracted with `scraper` and unwrapped
//! from the engine's redirect links.

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use leadscout_shared::{LeadScoutError, RateLimiter, Result};

use crate::DomainCollector;

/// Production endpoint for the fallback results engine.
pub const FALLBACK_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Request timeout in seconds.
const TIMEOUT_SECS: u64 = 12;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

/// Client for the fallback results engine.
pub struct FallbackSearch {
    client: Client,
    base_url: String,
    limiter: RateLimiter,
}

impl FallbackSearch {
    /// Build a fallback search client with the given resolved rate.
    pub fn new(requests_per_second: f64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: FALLBACK_ENDPOINT.into(),
            limiter: RateLimiter::per_second(requests_per_second),
        })
    }

    /// Point the client at a different endpoint (for mock servers).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query one keyword and push unique result domains into `collector`
    /// until the run-wide `max_results` is reached.
    ///
    /// Any failure aborts only this keyword's contribution.
    pub async fn search_keyword(
        &self,
        keyword: &str,
        collector: &mut DomainCollector,
        max_results: usize,
    ) {
        self.limiter.wait().await;

        let response = match self
            .client
            .get(&self.base_url)
            .query(&[("q", keyword)])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(keyword, error = %e, "fallback search request failed, dropping keyword");
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(keyword, %status, "fallback search returned non-2xx, dropping keyword");
            return;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(keyword, error = %e, "fallback search body unreadable, dropping keyword");
                return;
            }
        };

        for url in extract_result_urls(&body) {
            collector.push_url(&url);
            if collector.len() >= max_results {
                break;
            }
        }
    }
}

/// Pull result URLs out of an engine results page.
///
/// Result anchors carry the `result__a` class; hrefs are either direct or
/// redirect links whose `uddg` query parameter holds the real target.
fn extract_result_urls(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let anchor_sel = Selector::parse("a.result__a[href]").expect("result anchor selector");

    let mut urls = Vec::new();
    for el in doc.select(&anchor_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if let Some(url) = unwrap_redirect(href) {
            urls.push(url);
        }
    }
    urls
}

/// Resolve a result href to the destination URL, unwrapping redirect links.
fn unwrap_redirect(href: &str) -> Option<String> {
    // Protocol-relative links come back from the engine.
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    for (key, value) in parsed.query_pairs() {
        if key == "uddg" {
            return Some(value.into_owned());
        }
    }
    Some(absolute)
}
