//! Watchlist provider: sanctions/watchlist screening per domain.
//!
//! Same bounded-retry shape as the company provider, but with no permanent
//! fast path — every non-2xx retries up to the attempt cap. Domains whose
//! every attempt failed get an explicit [`WatchlistStatus::NotChecked`]
//! rather than being omitted.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use leadscout_shared::{Domain, LeadScoutError, RateLimiter, Result, WatchlistStatus};

use crate::retry::{MAX_ATTEMPTS, ProviderError, backoff_delay};

/// Production endpoint for the watchlist match API.
pub const WATCHLIST_ENDPOINT: &str = "https://api.opensanctions.org/match";

/// Request timeout in seconds.
const TIMEOUT_SECS: u64 = 12;

/// User-Agent string for screening requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MatchResponse {
    #[serde(default)]
    results: Vec<MatchResult>,
}

#[derive(Debug, Deserialize)]
struct MatchResult {
    score: Option<f64>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the watchlist match API.
pub struct WatchlistClient {
    client: Client,
    base_url: String,
    /// Match score at or above which a domain is flagged. Policy constant
    /// from configuration, not a fixed law.
    hit_threshold: f64,
    limiter: RateLimiter,
}

impl WatchlistClient {
    /// Build a watchlist client with a resolved rate and hit threshold.
    pub fn new(hit_threshold: f64, requests_per_second: f64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: WATCHLIST_ENDPOINT.into(),
            hit_threshold,
            limiter: RateLimiter::per_second(requests_per_second),
        })
    }

    /// Point the client at a different endpoint (self-hosted deployments,
    /// mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Screen every distinct domain. Every input domain gets an entry.
    pub async fn screen_domains(&self, domains: &[Domain]) -> HashMap<Domain, WatchlistStatus> {
        let mut statuses = HashMap::new();
        let mut failed = 0usize;

        for domain in domains {
            let status = match self.match_with_retry(domain).await {
                Ok(score) => WatchlistStatus::Screened {
                    score,
                    hit: score.is_some_and(|s| s >= self.hit_threshold),
                },
                Err(e) => {
                    debug!(domain = %domain, error = %e, "watchlist screening failed");
                    failed += 1;
                    WatchlistStatus::NotChecked
                }
            };
            statuses.insert(domain.clone(), status);
            self.limiter.wait().await;
        }

        info!(
            checked = domains.len() - failed,
            failed,
            hits = statuses.values().filter(|s| s.is_hit()).count(),
            "watchlist screening complete"
        );
        statuses
    }

    /// Retry every failure up to the cap — there is no permanent fast path
    /// for this provider.
    async fn match_with_retry(
        &self,
        domain: &Domain,
    ) -> std::result::Result<Option<f64>, ProviderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.top_match_score(domain).await {
                Ok(score) => return Ok(score),
                Err(e) if attempt >= MAX_ATTEMPTS => return Err(e),
                Err(e) => {
                    debug!(domain = %domain, attempt, error = %e, "watchlist retrying");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
            }
        }
    }

    async fn top_match_score(
        &self,
        domain: &Domain,
    ) -> std::result::Result<Option<f64>, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", domain.as_str()), ("size", "1")])
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Transient(format!("HTTP {status}")));
        }

        let body: MatchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("bad response body: {e}")))?;
        Ok(body.results.first().and_then(|top| top.score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn domain(host: &str) -> Domain {
        Domain::from_url(host).unwrap()
    }

    async fn client_for(server: &MockServer) -> WatchlistClient {
        WatchlistClient::new(0.85, 0.0)
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn score_at_threshold_is_a_hit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("q", "shady.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"score": 0.9}]
            })))
            .mount(&server)
            .await;

        let statuses = client_for(&server)
            .await
            .screen_domains(&[domain("shady.com")])
            .await;

        assert_eq!(
            statuses[&domain("shady.com")],
            WatchlistStatus::Screened {
                score: Some(0.9),
                hit: true
            }
        );
    }

    #[tokio::test]
    async fn score_below_threshold_is_not_a_hit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"score": 0.4}]
            })))
            .mount(&server)
            .await;

        let statuses = client_for(&server)
            .await
            .screen_domains(&[domain("fine.com")])
            .await;

        assert_eq!(
            statuses[&domain("fine.com")],
            WatchlistStatus::Screened {
                score: Some(0.4),
                hit: false
            }
        );
    }

    #[tokio::test]
    async fn no_matches_screens_clean() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})),
            )
            .mount(&server)
            .await;

        let statuses = client_for(&server)
            .await
            .screen_domains(&[domain("clean.com")])
            .await;

        assert_eq!(
            statuses[&domain("clean.com")],
            WatchlistStatus::Screened {
                score: None,
                hit: false
            }
        );
    }

    #[tokio::test]
    async fn exhausted_retries_yield_explicit_not_checked() {
        let server = MockServer::start().await;

        // Even a 404 retries here — this provider has no permanent set.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let statuses = client_for(&server)
            .await
            .screen_domains(&[domain("unknown.com")])
            .await;

        // The domain is present with an explicit not-checked state.
        assert_eq!(statuses[&domain("unknown.com")], WatchlistStatus::NotChecked);
    }

    #[tokio::test]
    async fn custom_threshold_is_honored() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"score": 0.6}]
            })))
            .mount(&server)
            .await;

        let client = WatchlistClient::new(0.5, 0.0)
            .unwrap()
            .with_base_url(server.uri());
        let statuses = client.screen_domains(&[domain("edge.com")]).await;

        assert!(statuses[&domain("edge.com")].is_hit());
    }
}
