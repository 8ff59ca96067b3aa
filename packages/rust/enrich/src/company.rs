//! Company-profile provider: firmographic lookup per domain.
//!
//! One GET per distinct domain with bounded retry. Responses are validated
//! into typed structs at this boundary and reduced to a [`CompanyProfile`].

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use leadscout_shared::{CompanyProfile, Domain, LeadScoutError, RateLimiter, Result};

use crate::retry::{MAX_ATTEMPTS, ProviderError, backoff_delay};

/// Production endpoint for the company lookup API.
pub const COMPANY_ENDPOINT: &str = "https://company.clearbit.com/v2/companies/find";

/// Statuses that mean the lookup can never succeed — no retry.
const PERMANENT_STATUSES: [u16; 5] = [401, 402, 403, 404, 422];

/// Tags kept per company.
const MAX_TAGS: usize = 20;

/// Request timeout in seconds.
const TIMEOUT_SECS: u64 = 12;

/// User-Agent string for lookup requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompanyResponse {
    name: Option<String>,
    domain: Option<String>,
    site: Site,
    metrics: Metrics,
    category: Category,
    tags: Vec<String>,
    logo: Option<String>,
    twitter: Option<Social>,
    linkedin: Option<Social>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Site {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metrics {
    employees: Option<i64>,
    #[serde(rename = "employeesRange")]
    employees_range: Option<String>,
    raised: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Category {
    sector: Option<String>,
    industry: Option<String>,
    #[serde(rename = "subIndustry")]
    sub_industry: Option<String>,
}

/// Social handles come back either as `{"handle": "..."}` or a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Social {
    Object { handle: Option<String> },
    Plain(String),
}

impl Social {
    fn into_handle(self) -> Option<String> {
        match self {
            Self::Object { handle } => handle,
            Self::Plain(handle) => Some(handle),
        }
    }
}

impl CompanyResponse {
    fn into_profile(self) -> CompanyProfile {
        let tags = if self.tags.is_empty() {
            None
        } else {
            Some(
                self.tags
                    .into_iter()
                    .take(MAX_TAGS)
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };

        CompanyProfile {
            name: self.name,
            domain: self.domain,
            site: self.site.url,
            employees: self.metrics.employees,
            employees_range: self.metrics.employees_range,
            raised: self.metrics.raised,
            sector: self.category.sector,
            industry: self.category.industry,
            subindustry: self.category.sub_industry,
            tags,
            logo: self.logo,
            twitter: self.twitter.and_then(Social::into_handle),
            linkedin: self.linkedin.and_then(Social::into_handle),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the company-profile lookup API.
pub struct CompanyClient {
    client: Client,
    base_url: String,
    api_key: String,
    limiter: RateLimiter,
}

impl CompanyClient {
    /// Build a company client with a resolved rate.
    pub fn new(api_key: String, requests_per_second: f64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: COMPANY_ENDPOINT.into(),
            api_key,
            limiter: RateLimiter::per_second(requests_per_second),
        })
    }

    /// Point the client at a different endpoint (self-hosted deployments,
    /// mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Look up every distinct domain, returning profiles for the successes.
    ///
    /// Failed domains are simply absent from the map — their fields stay
    /// unset downstream. The provider delay follows every lookup regardless
    /// of outcome.
    pub async fn enrich_domains(&self, domains: &[Domain]) -> HashMap<Domain, CompanyProfile> {
        let mut profiles = HashMap::new();
        for domain in domains {
            match self.lookup_with_retry(domain).await {
                Ok(profile) => {
                    profiles.insert(domain.clone(), profile);
                }
                Err(e) => {
                    debug!(domain = %domain, error = %e, "company lookup skipped");
                }
            }
            self.limiter.wait().await;
        }

        info!(
            checked = domains.len(),
            enriched = profiles.len(),
            "company enrichment complete"
        );
        profiles
    }

    async fn lookup_with_retry(
        &self,
        domain: &Domain,
    ) -> std::result::Result<CompanyProfile, ProviderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.lookup(domain).await {
                Ok(profile) => return Ok(profile),
                Err(e) if e.is_permanent() || attempt >= MAX_ATTEMPTS => return Err(e),
                Err(e) => {
                    debug!(domain = %domain, attempt, error = %e, "company lookup retrying");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
            }
        }
    }

    async fn lookup(&self, domain: &Domain) -> std::result::Result<CompanyProfile, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("domain", domain.as_str())])
            .basic_auth(&self.api_key, None::<&str>)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status().as_u16();
        if PERMANENT_STATUSES.contains(&status) {
            return Err(ProviderError::Permanent(status));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Transient(format!("HTTP {status}")));
        }

        let body: CompanyResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("bad response body: {e}")))?;
        Ok(body.into_profile())
    }
}
