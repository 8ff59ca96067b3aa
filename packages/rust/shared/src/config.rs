//! Pipeline manifest configuration for LeadScout.
//!
//! The manifest lives at `~/.leadscout/leadscout.toml` (or a path given on
//! the command line). CLI flags override manifest values, which override
//! defaults. Credentials are never stored in the manifest — only the *names*
//! of the environment variables holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadScoutError, Result};

/// Default manifest file name.
const CONFIG_FILE_NAME: &str = "leadscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscout";

// ---------------------------------------------------------------------------
// Manifest sections (matching leadscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level pipeline manifest, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Crawl/throttle policy.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Domain discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Contact harvesting settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Enrichment provider toggles and credentials.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Audit tool collaboration.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Output file locations.
    #[serde(default)]
    pub io: IoConfig,
}

/// `[policy]` section — robots and per-provider throttles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Whether the harvester consults robots.txt at all.
    #[serde(default = "default_true")]
    pub respect_robots: bool,

    /// Baseline requests-per-second for stages without an explicit override.
    #[serde(default = "default_rate")]
    pub rate_limit_rps: f64,

    /// Watchlist match score at or above which a domain is flagged.
    #[serde(default = "default_hit_threshold")]
    pub watchlist_hit_threshold: f64,

    /// Optional per-provider throttles (fall back to stage defaults).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_primary_rps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_fallback_rps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_rps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchlist_rps: Option<f64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            respect_robots: true,
            rate_limit_rps: default_rate(),
            watchlist_hit_threshold: default_hit_threshold(),
            discovery_primary_rps: None,
            discovery_fallback_rps: None,
            company_rps: None,
            watchlist_rps: None,
        }
    }
}

impl PolicyConfig {
    /// Resolved (primary, fallback) discovery rates.
    ///
    /// The default rate is halved when safe search is on; an explicit
    /// per-provider override always wins.
    pub fn discovery_rates(&self, safe_search: bool) -> (f64, f64) {
        let default = if safe_search { 0.5 } else { 1.0 };
        (
            self.discovery_primary_rps.unwrap_or(default),
            self.discovery_fallback_rps.unwrap_or(default),
        )
    }

    /// Resolved company-provider rate.
    pub fn company_rate(&self) -> f64 {
        self.company_rps.unwrap_or(self.rate_limit_rps)
    }

    /// Resolved watchlist-provider rate.
    pub fn watchlist_rate(&self) -> f64 {
        self.watchlist_rps.unwrap_or(self.rate_limit_rps)
    }
}

fn default_true() -> bool {
    true
}
fn default_rate() -> f64 {
    1.0
}
fn default_hit_threshold() -> f64 {
    0.85
}

/// Which search providers discovery may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryProvider {
    /// Primary first, topped up from the fallback engine when short.
    #[default]
    Auto,
    /// Primary search API only.
    Primary,
    /// Fallback engine only.
    Fallback,
}

impl std::str::FromStr for DiscoveryProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "primary" => Ok(Self::Primary),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!("unknown provider {other:?} (auto|primary|fallback)")),
        }
    }
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Topic keywords to search for.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Extra query phrasings merged into the keyword set.
    #[serde(default)]
    pub query_variants: Vec<String>,

    /// Cap on discovered domains per run.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Provider selection.
    #[serde(default)]
    pub provider: DiscoveryProvider,

    /// Content filtering on provider queries.
    #[serde(default = "default_true")]
    pub safe_search: bool,

    /// Result language hint.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Result country hint.
    #[serde(default = "default_country")]
    pub country: String,

    /// Search engine id for the primary provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_engine_id: Option<String>,

    /// Name of the env var holding the primary provider's API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            query_variants: Vec::new(),
            max_results: default_max_results(),
            provider: DiscoveryProvider::Auto,
            safe_search: true,
            lang: default_lang(),
            country: default_country(),
            search_engine_id: None,
            api_key_env: default_search_key_env(),
        }
    }
}

impl DiscoveryConfig {
    /// `max_results` clamped to a sane window.
    pub fn clamped_max_results(&self) -> usize {
        self.max_results.clamp(1, 100)
    }
}

fn default_max_results() -> usize {
    50
}
fn default_lang() -> String {
    "en".into()
}
fn default_country() -> String {
    "US".into()
}
fn default_search_key_env() -> String {
    "LEADSCOUT_SEARCH_API_KEY".into()
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Whether the harvesting stage runs at all.
    #[serde(default = "default_true")]
    pub fetch_contacts: bool,

    /// Page budget per domain (attempted fetches that pass robots).
    #[serde(default = "default_max_pages")]
    pub max_pages_per_domain: usize,

    /// User agent sent by the renderer and the robots gate.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            fetch_contacts: true,
            max_pages_per_domain: default_max_pages(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_pages() -> usize {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0".into()
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Batch feature-enrichment provider.
    #[serde(default)]
    pub enable_features: bool,

    /// Company-profile lookup provider.
    #[serde(default)]
    pub enable_company: bool,

    /// Sanctions/watchlist screening provider.
    #[serde(default)]
    pub enable_watchlist: bool,

    /// Batch endpoint for the feature provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features_endpoint: Option<String>,

    /// Name of the env var holding the feature provider's API key.
    #[serde(default = "default_features_key_env")]
    pub features_api_key_env: String,

    /// Name of the env var holding the company provider's API key.
    #[serde(default = "default_company_key_env")]
    pub company_api_key_env: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enable_features: false,
            enable_company: false,
            enable_watchlist: false,
            features_endpoint: None,
            features_api_key_env: default_features_key_env(),
            company_api_key_env: default_company_key_env(),
        }
    }
}

fn default_features_key_env() -> String {
    "LEADSCOUT_FEATURES_API_KEY".into()
}
fn default_company_key_env() -> String {
    "LEADSCOUT_COMPANY_API_KEY".into()
}

/// `[audit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether the pipeline invokes the audit runner and ingests reports.
    #[serde(default = "default_true")]
    pub run_audits: bool,

    /// Audit runner script, invoked once per run.
    #[serde(default = "default_runner_script")]
    pub runner_script: String,

    /// Directory the audit tool writes JSON reports into.
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            run_audits: true,
            runner_script: default_runner_script(),
            report_dir: default_report_dir(),
        }
    }
}

fn default_runner_script() -> String {
    "./scripts/run_audits.sh".into()
}
fn default_report_dir() -> String {
    "./outputs/lighthouse".into()
}

/// `[io]` section — output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_domains_file")]
    pub domains_file: String,
    #[serde(default = "default_contacts_csv")]
    pub contacts_csv: String,
    #[serde(default = "default_audits_csv")]
    pub audits_csv: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            domains_file: default_domains_file(),
            contacts_csv: default_contacts_csv(),
            audits_csv: default_audits_csv(),
            db_path: default_db_path(),
        }
    }
}

fn default_output_dir() -> String {
    "./outputs".into()
}
fn default_domains_file() -> String {
    "./outputs/domains.txt".into()
}
fn default_contacts_csv() -> String {
    "./outputs/contacts.csv".into()
}
fn default_audits_csv() -> String {
    "./outputs/audits.csv".into()
}
fn default_db_path() -> String {
    "./outputs/leadscout.db".into()
}

// ---------------------------------------------------------------------------
// Manifest loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the manifest file (`~/.leadscout/leadscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the manifest from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<Manifest> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "manifest not found, using defaults");
        return Ok(Manifest::default());
    }

    load_config_from(&path)
}

/// Load the manifest from a specific file path.
pub fn load_config_from(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadScoutError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        LeadScoutError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default manifest.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = Manifest::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadScoutError::io(&path, e))?;
    tracing::info!(?path, "created default manifest");

    Ok(path)
}

/// Read a credential from the env var named in config.
/// Returns `None` when unset or empty — callers degrade the provider.
pub fn credential_from_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Some(val),
        _ => None,
    }
}
