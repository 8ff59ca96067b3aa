//! Primary search provider: a Custom-Search-style JSON API.
//!
//! Paginated at 10 results per page with a hard provider-side offset cap.
//! Responses are validated into typed structs at this boundary; nothing
//! downstream ever sees raw JSON.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use leadscout_shared::{LeadScoutError, RateLimiter, Result};

use crate::DomainCollector;

/// Production endpoint for the primary search API.
pub const PRIMARY_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Results per page (provider maximum).
const PAGE_SIZE: usize = 10;

/// Last valid 1-indexed start offset (the provider serves at most 10 pages).
const MAX_START: usize = 91;

/// Request timeout in seconds.
const TIMEOUT_SECS: u64 = 12;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

/// Settings for the primary provider, resolved before construction.
#[derive(Debug, Clone)]
pub struct PrimaryOptions {
    /// API key; `None` degrades the provider to an empty contribution.
    pub api_key: Option<String>,
    /// Search engine id; `None` degrades likewise.
    pub engine_id: Option<String>,
    /// Result language hint (empty to omit).
    pub lang: String,
    /// Result country hint (empty to omit).
    pub country: String,
    /// Content filtering on queries.
    pub safe_search: bool,
    /// Resolved requests-per-second for this provider.
    pub requests_per_second: f64,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
    #[serde(rename = "formattedUrl")]
    formatted_url: Option<String>,
}

impl SearchItem {
    fn url(&self) -> Option<&str> {
        self.link.as_deref().or(self.formatted_url.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the primary search API.
pub struct PrimarySearch {
    client: Client,
    base_url: String,
    options: PrimaryOptions,
    limiter: RateLimiter,
}

impl PrimarySearch {
    /// Build a primary search client.
    pub fn new(options: PrimaryOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        let limiter = RateLimiter::per_second(options.requests_per_second);
        Ok(Self {
            client,
            base_url: PRIMARY_ENDPOINT.into(),
            options,
            limiter,
        })
    }

    /// Point the client at a different endpoint (for mock servers).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether both credentials are present.
    pub fn is_configured(&self) -> bool {
        self.options.api_key.is_some() && self.options.engine_id.is_some()
    }

    /// Paginate one keyword, pushing unique domains into `collector` until
    /// the run-wide `max_results` is reached.
    ///
    /// Any non-2xx response or transport failure aborts only this keyword's
    /// pagination; sibling keywords proceed.
    pub async fn search_keyword(
        &self,
        keyword: &str,
        collector: &mut DomainCollector,
        max_results: usize,
    ) {
        let (Some(api_key), Some(engine_id)) =
            (&self.options.api_key, &self.options.engine_id)
        else {
            return;
        };

        let mut start = 1usize;
        while collector.len() < max_results && start <= MAX_START {
            let num = PAGE_SIZE.min(max_results - collector.len());

            let mut params: Vec<(&str, String)> = vec![
                ("key", api_key.clone()),
                ("cx", engine_id.clone()),
                ("q", keyword.to_string()),
                ("num", num.to_string()),
                ("start", start.to_string()),
                (
                    "safe",
                    if self.options.safe_search {
                        "active".into()
                    } else {
                        "off".into()
                    },
                ),
            ];
            if !self.options.lang.is_empty() {
                params.push(("lr", format!("lang_{}", self.options.lang)));
            }
            if !self.options.country.is_empty() {
                params.push(("gl", self.options.country.clone()));
            }

            self.limiter.wait().await;

            let response = match self.client.get(&self.base_url).query(&params).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(keyword, error = %e, "primary search request failed, dropping keyword");
                    break;
                }
            };

            let status = response.status();
            if !status.is_success() {
                warn!(keyword, %status, "primary search returned non-2xx, dropping keyword");
                break;
            }

            let page: SearchResponse = match response.json().await {
                Ok(page) => page,
                Err(e) => {
                    warn!(keyword, error = %e, "primary search response unreadable, dropping keyword");
                    break;
                }
            };

            if page.items.is_empty() {
                debug!(keyword, start, "primary search page empty, keyword exhausted");
                break;
            }

            for item in &page.items {
                if let Some(url) = item.url() {
                    collector.push_url(url);
                    if collector.len() >= max_results {
                        break;
                    }
                }
            }

            start += PAGE_SIZE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_options() -> PrimaryOptions {
        PrimaryOptions {
            api_key: Some("test-key".into()),
            engine_id: Some("test-cx".into()),
            lang: "en".into(),
            country: "US".into(),
            safe_search: false,
            requests_per_second: 0.0,
        }
    }

    fn page_of(hosts: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "items": hosts
                .iter()
                .map(|h| serde_json::json!({"link": format!("https://{h}/some/page")}))
                .collect::<Vec<_>>()
        })
    }

    #[tokio::test]
    async fn paginates_until_max_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&[
                "a1.com", "a2.com", "a3.com", "a4.com", "a5.com", "a6.com", "a7.com", "a8.com",
                "a9.com", "a10.com",
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("start", "11"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(page_of(&["b1.com", "b2.com", "b3.com"])),
            )
            .mount(&server)
            .await;

        let search = PrimarySearch::new(test_options())
            .unwrap()
            .with_base_url(server.uri());

        let mut collector = DomainCollector::new();
        search.search_keyword("plumbers", &mut collector, 12).await;

        let domains = collector.into_vec();
        assert_eq!(domains.len(), 12);
        assert_eq!(domains[0].as_str(), "a1.com");
        assert_eq!(domains[11].as_str(), "b2.com");
    }

    #[tokio::test]
    async fn empty_page_stops_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&["only.com"])))
            .expect(1)
            .mount(&server)
            .await;

        // A one-item page is followed by a request for page 2, which is empty.
        Mock::given(method("GET"))
            .and(query_param("start", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let search = PrimarySearch::new(test_options())
            .unwrap()
            .with_base_url(server.uri());

        let mut collector = DomainCollector::new();
        search.search_keyword("plumbers", &mut collector, 50).await;

        assert_eq!(collector.into_vec().len(), 1);
    }

    #[tokio::test]
    async fn non_2xx_aborts_only_this_keyword() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("q", "bad"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("q", "good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&["ok.com"])))
            .mount(&server)
            .await;

        let search = PrimarySearch::new(test_options())
            .unwrap()
            .with_base_url(server.uri());

        let mut collector = DomainCollector::new();
        search.search_keyword("bad", &mut collector, 10).await;
        search.search_keyword("good", &mut collector, 10).await;

        let domains = collector.into_vec();
        assert_eq!(domains.len(), 1);
        assert_eq!(domains[0].as_str(), "ok.com");
    }

    #[tokio::test]
    async fn missing_credentials_yield_empty_contribution() {
        let search = PrimarySearch::new(PrimaryOptions {
            api_key: None,
            ..test_options()
        })
        .unwrap();

        assert!(!search.is_configured());

        let mut collector = DomainCollector::new();
        search.search_keyword("anything", &mut collector, 10).await;
        assert!(collector.into_vec().is_empty());
    }

    #[tokio::test]
    async fn safe_search_and_locale_forwarded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("safe", "active"))
            .and(query_param("lr", "lang_de"))
            .and(query_param("gl", "DE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&["de.com"])))
            .expect(1..)
            .mount(&server)
            .await;

        let search = PrimarySearch::new(PrimaryOptions {
            lang: "de".into(),
            country: "DE".into(),
            safe_search: true,
            ..test_options()
        })
        .unwrap()
        .with_base_url(server.uri());

        let mut collector = DomainCollector::new();
        search.search_keyword("bäcker", &mut collector, 1).await;
        assert_eq!(collector.into_vec().len(), 1);
    }
}
