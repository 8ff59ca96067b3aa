//! Shared types, error model, and configuration for LeadScout.
//!
//! This crate is the foundation depended on by all other LeadScout crates.
//! It provides:
//! - [`LeadScoutError`] — the unified error type
//! - Domain types ([`Domain`], [`ContactRecord`], [`LeadRecord`], [`AuditRow`])
//! - Manifest configuration ([`Manifest`], config loading)
//! - [`RateLimiter`] — the per-provider throttle gate

pub mod config;
pub mod error;
pub mod limit;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AuditConfig, DiscoveryConfig, DiscoveryProvider, EnrichmentConfig, IoConfig, Manifest,
    PolicyConfig, ScrapeConfig, config_dir, config_file_path, credential_from_env, init_config,
    load_config, load_config_from,
};
pub use error::{LeadScoutError, Result};
pub use limit::RateLimiter;
pub use types::{
    AuditRow, CompanyProfile, ContactRecord, Domain, LeadRecord, LeadScore, Priority,
    WatchlistStatus,
};
