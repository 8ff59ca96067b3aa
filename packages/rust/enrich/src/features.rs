//! Batch feature-enrichment provider.
//!
//! Unlike the per-domain providers, this one takes the whole distinct-domain
//! set in a single call. Returned columns are prefixed before merging so they
//! can never collide with existing fields. Any failure degrades the whole
//! call to a no-op merge.

use std::collections::{BTreeMap, HashMap};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use leadscout_shared::{Domain, LeadScoutError, Result};

/// Prefix applied to every returned feature column.
pub const FEATURE_PREFIX: &str = "feat_";

/// Request timeout in seconds — batch calls can be slow.
const TIMEOUT_SECS: u64 = 60;

/// User-Agent string for enrichment requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct FeatureRequest<'a> {
    search_key: &'static str,
    domains: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct FeatureResponse {
    #[serde(default)]
    rows: Vec<FeatureRow>,
}

/// One enriched row: the domain key plus arbitrary feature columns.
#[derive(Debug, Deserialize)]
struct FeatureRow {
    domain: String,
    #[serde(flatten)]
    columns: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the batch feature-enrichment service.
pub struct FeatureEnricher {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl FeatureEnricher {
    /// Build a feature enricher for a configured endpoint.
    pub fn new(endpoint: String, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Enrich the distinct-domain set in one batch call.
    ///
    /// Returns `None` on any failure — the caller merges nothing and the
    /// original rows pass through unchanged.
    pub async fn enrich(&self, domains: &[Domain]) -> Option<HashMap<Domain, BTreeMap<String, String>>> {
        let request = FeatureRequest {
            search_key: "domain",
            domains: domains.iter().map(Domain::as_str).collect(),
        };

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "feature enrichment request failed, passing rows through");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "feature enrichment returned non-2xx, passing rows through");
            return None;
        }

        let body: FeatureResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "feature enrichment response unreadable, passing rows through");
                return None;
            }
        };

        let mut features = HashMap::new();
        for row in body.rows {
            let Some(domain) = Domain::from_url(&row.domain) else {
                continue;
            };
            let columns: BTreeMap<String, String> = row
                .columns
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(name, value)| {
                    let rendered = match value.as_str() {
                        Some(s) => s.to_string(),
                        None => value.to_string(),
                    };
                    (format!("{FEATURE_PREFIX}{name}"), rendered)
                })
                .collect();
            features.insert(domain, columns);
        }

        info!(
            requested = domains.len(),
            enriched = features.len(),
            "feature enrichment complete"
        );
        Some(features)
    }
}
