//! Enrichment orchestration: fan a domain set out to independent,
//! rate-limited providers and merge results back by domain key.
//!
//! Providers run in sequence over the same distinct-domain set, each with its
//! own rate limiter and retry policy. The merge is accretion-only: later
//! providers add fields, and an absent or failed provider leaves existing
//! fields untouched.

mod company;
mod features;
mod retry;
mod watchlist;

use tracing::{info, instrument, warn};

use leadscout_shared::{Domain, LeadRecord, Manifest, Result, credential_from_env};

pub use company::{COMPANY_ENDPOINT, CompanyClient};
pub use features::{FEATURE_PREFIX, FeatureEnricher};
pub use retry::{MAX_ATTEMPTS, ProviderError, backoff_delay};
pub use watchlist::{WATCHLIST_ENDPOINT, WatchlistClient};

/// The sorted distinct domains across a set of lead rows.
pub fn distinct_domains(rows: &[LeadRecord]) -> Vec<Domain> {
    let mut domains: Vec<Domain> = rows.iter().map(|r| r.contact.domain.clone()).collect();
    domains.sort();
    domains.dedup();
    domains
}

/// Runs the enabled enrichment providers over a lead set.
///
/// A provider is `None` when disabled in config or missing its credential —
/// in either case it contributes nothing and the rows pass through.
pub struct Orchestrator {
    features: Option<FeatureEnricher>,
    company: Option<CompanyClient>,
    watchlist: Option<WatchlistClient>,
}

impl Orchestrator {
    /// Build from already-constructed provider clients.
    pub fn new(
        features: Option<FeatureEnricher>,
        company: Option<CompanyClient>,
        watchlist: Option<WatchlistClient>,
    ) -> Self {
        Self {
            features,
            company,
            watchlist,
        }
    }

    /// Build from the manifest, resolving credentials from the environment
    /// and per-provider rates from policy.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let enrichment = &manifest.enrichment;
        let policy = &manifest.policy;

        let features = if enrichment.enable_features {
            match (
                enrichment.features_endpoint.clone(),
                credential_from_env(&enrichment.features_api_key_env),
            ) {
                (Some(endpoint), Some(key)) => Some(FeatureEnricher::new(endpoint, key)?),
                (None, _) => {
                    warn!("feature enrichment enabled but no endpoint configured, skipping provider");
                    None
                }
                (_, None) => {
                    warn!(
                        env = %enrichment.features_api_key_env,
                        "feature enrichment credential not set, skipping provider"
                    );
                    None
                }
            }
        } else {
            None
        };

        let company = if enrichment.enable_company {
            match credential_from_env(&enrichment.company_api_key_env) {
                Some(key) => Some(CompanyClient::new(key, policy.company_rate())?),
                None => {
                    warn!(
                        env = %enrichment.company_api_key_env,
                        "company enrichment credential not set, skipping provider"
                    );
                    None
                }
            }
        } else {
            None
        };

        let watchlist = if enrichment.enable_watchlist {
            Some(WatchlistClient::new(
                policy.watchlist_hit_threshold,
                policy.watchlist_rate(),
            )?)
        } else {
            None
        };

        Ok(Self::new(features, company, watchlist))
    }

    /// Run every enabled provider and merge results into the rows.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn run(&self, mut rows: Vec<LeadRecord>) -> Vec<LeadRecord> {
        if rows.is_empty() {
            return rows;
        }
        let domains = distinct_domains(&rows);

        if let Some(features) = &self.features {
            if let Some(feature_map) = features.enrich(&domains).await {
                for row in &mut rows {
                    if let Some(columns) = feature_map.get(&row.contact.domain) {
                        row.features
                            .extend(columns.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    row.enriched = true;
                }
            }
        }

        if let Some(company) = &self.company {
            let profiles = company.enrich_domains(&domains).await;
            for row in &mut rows {
                if let Some(profile) = profiles.get(&row.contact.domain) {
                    row.company = Some(profile.clone());
                }
            }
        }

        if let Some(watchlist) = &self.watchlist {
            let statuses = watchlist.screen_domains(&domains).await;
            for row in &mut rows {
                // Every domain has an entry; NotChecked is explicit.
                row.watchlist = statuses.get(&row.contact.domain).copied();
            }
        }

        info!(
            rows = rows.len(),
            domains = domains.len(),
            "enrichment complete"
        );
        rows
    }
}
