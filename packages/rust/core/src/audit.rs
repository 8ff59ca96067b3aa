//! Audit-tool collaboration: invoke the external runner and ingest its
//! JSON reports.
//!
//! The audit tool is an opaque subprocess that writes one JSON report per
//! URL into a known directory, keyed by a sanitized slug of the URL. Reports
//! are validated into typed structs here; a missing or unreadable report
//! skips that URL only.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use leadscout_shared::{AuditRow, Domain, LeadScoutError, Result};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// The slice of the audit tool's JSON report the pipeline consumes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuditReport {
    categories: Categories,
    audits: Audits,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Categories {
    performance: CategoryScore,
    seo: CategoryScore,
    #[serde(rename = "best-practices")]
    best_practices: CategoryScore,
    accessibility: CategoryScore,
}

/// Category scores come back in 0–1.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryScore {
    score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Audits {
    #[serde(rename = "largest-contentful-paint")]
    largest_contentful_paint: Metric,
    #[serde(rename = "cumulative-layout-shift")]
    cumulative_layout_shift: Metric,
    #[serde(rename = "interaction-to-next-paint")]
    interaction_to_next_paint: Metric,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metric {
    #[serde(rename = "numericValue")]
    numeric_value: Option<f64>,
}

impl AuditReport {
    /// Flatten a report into an [`AuditRow`] for `page_url`.
    pub fn into_row(self, page_url: &str) -> AuditRow {
        let domain = Domain::from_url(page_url)
            .map(|d| d.as_str().to_string())
            .unwrap_or_else(|| page_url.to_string());

        AuditRow {
            domain,
            page_url: page_url.to_string(),
            performance: self.categories.performance.score.map(to_percent),
            seo: self.categories.seo.score.map(to_percent),
            best_practices: self.categories.best_practices.score.map(to_percent),
            accessibility: self.categories.accessibility.score.map(to_percent),
            lcp_ms: self.audits.largest_contentful_paint.numeric_value,
            cls: self.audits.cumulative_layout_shift.numeric_value,
            inp_ms: self.audits.interaction_to_next_paint.numeric_value,
        }
    }
}

/// Scale a 0–1 category score to 0–100, one decimal.
fn to_percent(score: f64) -> f64 {
    (score * 1000.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Report lookup
// ---------------------------------------------------------------------------

/// Reduce a URL to the report-file slug: scheme stripped, trailing slash
/// trimmed, case-folded, everything outside `[a-z0-9._-]` replaced with `_`.
pub fn sanitize_slug(url: &str) -> String {
    let without_scheme = match url.split_once("//") {
        Some((_, rest)) => rest,
        None => url,
    };
    without_scheme
        .trim_end_matches('/')
        .to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Candidate report paths for a URL, in lookup order.
fn report_candidates(report_dir: &Path, url: &str) -> [PathBuf; 3] {
    let slug = sanitize_slug(url);
    [
        report_dir.join(format!("{slug}.report.json")),
        report_dir.join(format!("{slug}.report.report.json")),
        report_dir.join(format!("{slug}.json")),
    ]
}

/// Read and parse the report for a URL from the report directory.
pub fn read_report(report_dir: &Path, url: &str) -> Result<AuditReport> {
    for candidate in report_candidates(report_dir, url) {
        if !candidate.exists() {
            continue;
        }
        let content =
            std::fs::read_to_string(&candidate).map_err(|e| LeadScoutError::io(&candidate, e))?;
        return serde_json::from_str(&content).map_err(|e| {
            LeadScoutError::parse(format!("{}: {e}", candidate.display()))
        });
    }
    Err(LeadScoutError::parse(format!(
        "no report found for {url} in {}",
        report_dir.display()
    )))
}

/// Collect one audit row per domain root URL that has a readable report.
///
/// Per-URL failures are logged and skipped; they never abort the stage.
pub fn collect_audit_rows(report_dir: &Path, domains: &[Domain]) -> Vec<AuditRow> {
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for domain in domains {
        let url = domain.root_url();
        match read_report(report_dir, &url) {
            Ok(report) => rows.push(report.into_row(&url)),
            Err(e) => {
                warn!(%url, error = %e, "audit report unreadable, skipping");
                skipped += 1;
            }
        }
    }

    info!(
        ingested = rows.len(),
        skipped,
        "audit report ingestion complete"
    );
    rows
}

// ---------------------------------------------------------------------------
// Runner invocation
// ---------------------------------------------------------------------------

/// Invoke the audit runner script once for the whole run.
///
/// A missing script is fatal ([`LeadScoutError::MissingArtifact`]); a
/// non-zero exit is an error as well.
pub async fn run_audit_script(script: &Path) -> Result<()> {
    if !script.exists() {
        return Err(LeadScoutError::missing_artifact(
            script.display().to_string(),
        ));
    }

    info!(script = %script.display(), "running audit script");
    let status = tokio::process::Command::new("bash")
        .arg(script)
        .status()
        .await
        .map_err(|e| LeadScoutError::io(script, e))?;

    if !status.success() {
        return Err(LeadScoutError::validation(format!(
            "audit runner exited with {status}"
        )));
    }
    Ok(())
}
