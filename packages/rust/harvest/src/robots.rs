//! Crawl-policy gate backed by robots.txt.
//!
//! Deliberately lenient: the gate denies only a global wildcard
//! `Disallow: /`, and any fetch failure, timeout, or unparsable body is
//! treated as **allowed** (fail-open). Verdicts are cached per origin for
//! the life of the gate.

use std::collections::HashMap;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use leadscout_shared::{LeadScoutError, Result};

/// robots.txt fetch timeout in seconds.
const FETCH_TIMEOUT_SECS: u64 = 6;

/// Answers allow/deny for URLs based on each origin's robots.txt.
pub struct RobotsGate {
    /// `None` when robots checking is disabled — everything is allowed.
    client: Option<Client>,
    cache: Mutex<HashMap<String, bool>>,
}

impl RobotsGate {
    /// A gate that fetches and honors robots.txt.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Some(client),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// A gate that allows everything without fetching.
    pub fn disabled() -> Self {
        Self {
            client: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-seed a cached verdict for an origin.
    #[cfg(test)]
    pub(crate) async fn seed(&self, origin: &str, allowed: bool) {
        self.cache.lock().await.insert(origin.to_string(), allowed);
    }

    /// Whether fetching `url` is allowed by its origin's policy.
    pub async fn is_allowed(&self, url: &str) -> bool {
        let Some(client) = &self.client else {
            return true;
        };

        let Some(origin) = origin_of(url) else {
            // Unparsable URL: nothing to check, fail open.
            return true;
        };

        let mut cache = self.cache.lock().await;
        if let Some(&verdict) = cache.get(&origin) {
            return verdict;
        }

        let verdict = match fetch_robots(client, &origin).await {
            Some(body) => !denies_all(&body),
            // Fetch failure or timeout: fail open.
            None => true,
        };

        debug!(origin, verdict, "robots.txt verdict cached");
        cache.insert(origin, verdict);
        verdict
    }
}

/// Extract `scheme://host[:port]` from a URL (scheme-less input gets https).
fn origin_of(url: &str) -> Option<String> {
    let absolute = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    let parsed = Url::parse(&absolute).ok()?;
    let host = parsed.host_str()?;
    let origin = match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    };
    Some(origin)
}

/// Fetch `{origin}/robots.txt`, returning `None` on any failure.
async fn fetch_robots(client: &Client, origin: &str) -> Option<String> {
    let url = format!("{origin}/robots.txt");
    let response = client.get(&url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.text().await.ok()
}

/// Whether the policy contains a global disallow-all for the wildcard agent.
fn denies_all(robots: &str) -> bool {
    let mut in_wildcard_group = false;
    for line in robots.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match field.trim().to_ascii_lowercase().as_str() {
            "user-agent" => in_wildcard_group = value == "*",
            "disallow" if in_wildcard_group && value == "/" => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn denies_all_detection() {
        assert!(denies_all("User-agent: *\nDisallow: /"));
        assert!(denies_all("USER-AGENT: *\nDISALLOW: /"));
        assert!(denies_all("User-agent: googlebot\nDisallow:\n\nUser-agent: *\nDisallow: /"));

        // Partial disallows and agent-specific blocks are not global denials.
        assert!(!denies_all("User-agent: *\nDisallow: /admin"));
        assert!(!denies_all("User-agent: badbot\nDisallow: /"));
        assert!(!denies_all(""));
        assert!(!denies_all("not a robots file at all"));
    }

    #[test]
    fn origin_extraction() {
        assert_eq!(
            origin_of("https://a.com/contact").as_deref(),
            Some("https://a.com")
        );
        assert_eq!(
            origin_of("http://a.com:8080/x").as_deref(),
            Some("http://a.com:8080")
        );
        assert_eq!(origin_of("a.com/x").as_deref(), Some("https://a.com"));
    }

    #[tokio::test]
    async fn disallow_all_is_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"),
            )
            .mount(&server)
            .await;

        let gate = RobotsGate::new("test-agent").unwrap();
        assert!(!gate.is_allowed(&format!("{}/contact", server.uri())).await);
    }

    #[tokio::test]
    async fn partial_disallow_is_allowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
            )
            .mount(&server)
            .await;

        let gate = RobotsGate::new("test-agent").unwrap();
        assert!(gate.is_allowed(&format!("{}/contact", server.uri())).await);
    }

    #[tokio::test]
    async fn unreachable_host_fails_open() {
        let gate = RobotsGate::new("test-agent").unwrap();
        assert!(gate.is_allowed("http://127.0.0.1:1/contact").await);
    }

    #[tokio::test]
    async fn missing_robots_fails_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gate = RobotsGate::new("test-agent").unwrap();
        assert!(gate.is_allowed(&format!("{}/", server.uri())).await);
    }

    #[tokio::test]
    async fn verdict_is_cached_per_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow:"))
            .expect(1)
            .mount(&server)
            .await;

        let gate = RobotsGate::new("test-agent").unwrap();
        let base = server.uri();
        assert!(gate.is_allowed(&format!("{base}/a")).await);
        assert!(gate.is_allowed(&format!("{base}/b")).await);
        assert!(gate.is_allowed(&format!("{base}/c")).await);
    }

    #[tokio::test]
    async fn disabled_gate_allows_without_fetching() {
        let gate = RobotsGate::disabled();
        assert!(gate.is_allowed("https://anything.example/page").await);
    }
}
