//! Core domain types for the LeadScout pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// A registrable hostname, lower-cased, with no scheme, path, or port.
///
/// `Domain` is the primary join key across the whole pipeline: discovery
/// produces them, harvesting/enrichment consume them, and every persisted
/// table is keyed by them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Extract the host from a URL or bare host string.
    ///
    /// Strips scheme, path, and port; lower-cases the result. Returns `None`
    /// for input with no usable host.
    pub fn from_url(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let host = if trimmed.contains("://") {
            let url = url::Url::parse(trimmed).ok()?;
            url.host_str()?.to_string()
        } else {
            // Bare host, possibly with a path or port attached.
            let mut host = trimmed.split('/').next().unwrap_or_default();
            if let Some((h, _port)) = host.rsplit_once(':') {
                host = h;
            }
            host.to_string()
        };

        if host.is_empty() {
            return None;
        }
        Some(Self(host.to_ascii_lowercase()))
    }

    /// The host as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The domain's root URL (`https://{host}`).
    pub fn root_url(&self) -> String {
        format!("https://{}", self.0)
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_url(s).ok_or_else(|| format!("not a valid domain: {s:?}"))
    }
}

// ---------------------------------------------------------------------------
// ContactRecord
// ---------------------------------------------------------------------------

/// A harvested contact email, tied to the page it was first seen on.
///
/// Uniqueness invariant: at most one record per `(domain, email)` pair
/// survives dedup, keeping the earliest-discovered `page_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub domain: Domain,
    pub page_url: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Enrichment types
// ---------------------------------------------------------------------------

/// Firmographic fields from the company-profile provider.
///
/// All fields are optional: providers return partial data, and a failed
/// lookup leaves the whole profile absent rather than zeroed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub site: Option<String>,
    pub employees: Option<i64>,
    pub employees_range: Option<String>,
    pub raised: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub subindustry: Option<String>,
    /// Up to 20 tags, comma-joined.
    pub tags: Option<String>,
    pub logo: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
}

/// Outcome of a watchlist screening for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WatchlistStatus {
    /// The provider answered. `score` is the top match's score (`None` when
    /// the provider returned no matches); `hit` is true when the score
    /// reached the configured threshold.
    Screened { score: Option<f64>, hit: bool },
    /// Every attempt failed; recorded explicitly so the domain is never
    /// silently omitted from the result set.
    NotChecked,
}

impl WatchlistStatus {
    /// The match score, when the domain was screened and matched.
    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Screened { score, .. } => *score,
            Self::NotChecked => None,
        }
    }

    /// Whether the domain was flagged. `NotChecked` is never a hit.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Screened { hit: true, .. })
    }
}

/// A contact row with its accreted enrichment fields.
///
/// Enrichment providers only ever add fields; a provider that is disabled,
/// unreachable, or has no data for a domain leaves the existing fields
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(flatten)]
    pub contact: ContactRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyProfile>,
    /// Feature columns from the batch enrichment provider, already prefixed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, String>,
    #[serde(default)]
    pub enriched: bool,
    /// `None` when the watchlist provider never ran for this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchlist: Option<WatchlistStatus>,
}

impl LeadRecord {
    /// Wrap a bare contact with no enrichment yet.
    pub fn from_contact(contact: ContactRecord) -> Self {
        Self {
            contact,
            company: None,
            features: BTreeMap::new(),
            enriched: false,
            watchlist: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Audit types
// ---------------------------------------------------------------------------

/// One audited page, sourced from the external audit tool's JSON report.
///
/// Category scores are 0–100; absent or non-numeric report values stay `None`
/// (they are treated as 0 only during score averaging).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub domain: String,
    pub page_url: String,
    pub performance: Option<f64>,
    pub seo: Option<f64>,
    pub best_practices: Option<f64>,
    pub accessibility: Option<f64>,
    pub lcp_ms: Option<f64>,
    pub cls: Option<f64>,
    pub inp_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// LeadScore
// ---------------------------------------------------------------------------

/// Priority bucket derived from a lead's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Bucket a score: `high` ≥ 40, `medium` ≥ 20, else `low`.
    pub fn from_score(score: f64) -> Self {
        if score >= 40.0 {
            Self::High
        } else if score >= 20.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived improvement-opportunity score for a domain, recomputed wholesale
/// on each scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScore {
    pub domain: String,
    pub score: f64,
    pub priority: Priority,
}
