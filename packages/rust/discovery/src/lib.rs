//! Candidate-domain discovery across search providers.
//!
//! Queries the primary search API (paginated), optionally topping up from the
//! fallback HTML engine, and reduces result URLs to a deduplicated,
//! first-seen-ordered set of registrable domains. A run where every provider
//! fails still returns normally — an empty list is a valid result.

mod fallback;
mod primary;

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, instrument};

use leadscout_shared::{
    DiscoveryProvider, Domain, LeadScoutError, Manifest, Result, credential_from_env,
};

pub use fallback::{FALLBACK_ENDPOINT, FallbackSearch};
pub use primary::{PRIMARY_ENDPOINT, PrimaryOptions, PrimarySearch};

// ---------------------------------------------------------------------------
// DomainCollector
// ---------------------------------------------------------------------------

/// Accumulates domains extracted from result URLs, deduplicating while
/// preserving first-seen order.
#[derive(Debug, Default)]
pub struct DomainCollector {
    seen: HashSet<Domain>,
    domains: Vec<Domain>,
}

impl DomainCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the domain from a raw result URL and record it if new.
    /// Malformed URLs are skipped silently. Returns true when a new domain
    /// was added.
    pub fn push_url(&mut self, raw_url: &str) -> bool {
        let Some(domain) = Domain::from_url(raw_url) else {
            return false;
        };
        self.push(domain)
    }

    /// Record an already-parsed domain if new.
    pub fn push(&mut self, domain: Domain) -> bool {
        if self.seen.contains(&domain) {
            return false;
        }
        self.seen.insert(domain.clone());
        self.domains.push(domain);
        true
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// The collected domains in first-seen order.
    pub fn into_vec(self) -> Vec<Domain> {
        self.domains
    }
}

// ---------------------------------------------------------------------------
// Keyword expansion
// ---------------------------------------------------------------------------

/// Union of keywords and configured variants, first-seen order, no duplicate
/// queries.
pub fn expand_keywords(keywords: &[String], variants: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut expanded = Vec::new();
    for kw in keywords.iter().chain(variants.iter()) {
        let kw = kw.trim();
        if kw.is_empty() || !seen.insert(kw.to_string()) {
            continue;
        }
        expanded.push(kw.to_string());
    }
    expanded
}

// ---------------------------------------------------------------------------
// Discoverer
// ---------------------------------------------------------------------------

/// Drives the configured providers over a keyword set.
pub struct Discoverer {
    provider: DiscoveryProvider,
    max_results: usize,
    primary: PrimarySearch,
    fallback: FallbackSearch,
}

impl Discoverer {
    /// Build a discoverer from resolved parts.
    pub fn new(
        provider: DiscoveryProvider,
        max_results: usize,
        primary: PrimarySearch,
        fallback: FallbackSearch,
    ) -> Self {
        Self {
            provider,
            max_results,
            primary,
            fallback,
        }
    }

    /// Build a discoverer from the manifest, resolving credentials from the
    /// environment and per-provider rates from policy.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let discovery = &manifest.discovery;
        let (primary_rps, fallback_rps) =
            manifest.policy.discovery_rates(discovery.safe_search);

        let primary = PrimarySearch::new(PrimaryOptions {
            api_key: credential_from_env(&discovery.api_key_env),
            engine_id: discovery.search_engine_id.clone(),
            lang: discovery.lang.clone(),
            country: discovery.country.clone(),
            safe_search: discovery.safe_search,
            requests_per_second: primary_rps,
        })?;
        let fallback = FallbackSearch::new(fallback_rps)?;

        Ok(Self::new(
            discovery.provider,
            discovery.clamped_max_results(),
            primary,
            fallback,
        ))
    }

    /// Discover up to `max_results` domains for the expanded keyword set.
    ///
    /// Returns whatever was found even when every provider failed.
    #[instrument(skip_all, fields(provider = ?self.provider, max_results = self.max_results))]
    pub async fn discover(&self, keywords: &[String], variants: &[String]) -> Vec<Domain> {
        let queries = expand_keywords(keywords, variants);
        let mut collector = DomainCollector::new();

        if matches!(
            self.provider,
            DiscoveryProvider::Auto | DiscoveryProvider::Primary
        ) {
            if self.primary.is_configured() {
                for keyword in &queries {
                    if collector.len() >= self.max_results {
                        break;
                    }
                    self.primary
                        .search_keyword(keyword, &mut collector, self.max_results)
                        .await;
                }
            } else {
                info!("primary search credentials not configured, skipping provider");
            }
        }

        let primary_found = collector.len();

        // Fallback only tops up a shortfall in auto mode.
        if matches!(
            self.provider,
            DiscoveryProvider::Auto | DiscoveryProvider::Fallback
        ) && collector.len() < self.max_results
        {
            for keyword in &queries {
                if collector.len() >= self.max_results {
                    break;
                }
                self.fallback
                    .search_keyword(keyword, &mut collector, self.max_results)
                    .await;
            }
        }

        info!(
            keywords = queries.len(),
            primary_found,
            total = collector.len(),
            "discovery complete"
        );

        collector.into_vec()
    }
}

// ---------------------------------------------------------------------------
// Domains file
// ---------------------------------------------------------------------------

/// Write one domain per line, creating parent directories.
pub fn write_domains_file(domains: &[Domain], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LeadScoutError::io(parent, e))?;
    }

    let mut content = String::new();
    for domain in domains {
        content.push_str(domain.as_str());
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|e| LeadScoutError::io(path, e))
}

/// Read a domains file, skipping blanks and `#` comments.
///
/// A missing file is fatal: harvesting cannot proceed without it.
pub fn read_domains_file(path: &Path) -> Result<Vec<Domain>> {
    if !path.exists() {
        return Err(LeadScoutError::missing_artifact(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| LeadScoutError::io(path, e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(Domain::from_url)
        .collect())
}
