//! End-to-end lead pipeline: discover → harvest → enrich → persist → score.
//!
//! A single worker drives each stage to completion before the next starts.
//! Per-item failures are isolated inside each stage; the only failures that
//! abort a run are missing required artifacts (the domains file for
//! file-driven harvesting, the audit runner script).

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use leadscout_discovery::{Discoverer, read_domains_file, write_domains_file};
use leadscout_enrich::Orchestrator;
use leadscout_harvest::{Harvester, HarvestOptions, PageRenderer, RobotsGate};
use leadscout_shared::{LeadRecord, LeadScore, Manifest, Result};
use leadscout_storage::{LeadStore, read_audits_csv, write_audits_csv, write_contacts_csv};

use crate::audit;

/// Summary of a completed pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    /// Run id recorded in the store.
    pub run_id: String,
    /// Domains discovered.
    pub domains_found: usize,
    /// Deduplicated contact rows after enrichment.
    pub contacts_found: usize,
    /// Audit rows ingested.
    pub audits_ingested: usize,
    /// Score rows computed.
    pub scores_computed: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &PipelineResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &PipelineResult) {}
}

/// Run the full pipeline.
///
/// 1. Discover candidate domains and write the domains file
/// 2. Harvest contacts (when enabled)
/// 3. Enrich via the configured providers
/// 4. Persist contacts (CSV + store)
/// 5. Run audits, ingest reports, recompute scores (when enabled)
#[instrument(skip_all)]
pub async fn run_pipeline<R: PageRenderer>(
    manifest: &Manifest,
    renderer: R,
    progress: &dyn ProgressReporter,
) -> Result<PipelineResult> {
    let start = Instant::now();

    let store = LeadStore::open(Path::new(&manifest.io.db_path)).await?;
    let run_id = store.insert_run().await?;

    // --- Phase 1: Discovery ---
    progress.phase("Discovering domains");
    let discoverer = Discoverer::from_manifest(manifest)?;
    let domains = discoverer
        .discover(
            &manifest.discovery.keywords,
            &manifest.discovery.query_variants,
        )
        .await;
    write_domains_file(&domains, Path::new(&manifest.io.domains_file))?;

    // --- Phase 2: Harvest ---
    let leads: Vec<LeadRecord> = if manifest.scrape.fetch_contacts {
        progress.phase("Harvesting contacts");
        harvest_contacts(manifest, renderer, &domains).await?
    } else {
        Vec::new()
    };

    // --- Phase 3: Enrichment ---
    progress.phase("Enriching leads");
    let orchestrator = Orchestrator::from_manifest(manifest)?;
    let leads = orchestrator.run(leads).await;

    // --- Phase 4: Persist contacts ---
    progress.phase("Persisting contacts");
    write_contacts_csv(&leads, Path::new(&manifest.io.contacts_csv))?;
    store.replace_contacts(&leads).await?;

    // --- Phase 5: Audits & scoring ---
    let (audits_ingested, scores_computed) = if manifest.audit.run_audits {
        progress.phase("Running audits");
        audit::run_audit_script(Path::new(&manifest.audit.runner_script)).await?;

        progress.phase("Ingesting audit reports");
        let rows = audit::collect_audit_rows(Path::new(&manifest.audit.report_dir), &domains);
        write_audits_csv(&rows, Path::new(&manifest.io.audits_csv))?;
        store.replace_audits(&rows).await?;
        let scores = store.compute_scores().await?;
        (rows.len(), scores.len())
    } else {
        (0, 0)
    };

    let result = PipelineResult {
        run_id: run_id.clone(),
        domains_found: domains.len(),
        contacts_found: leads.len(),
        audits_ingested,
        scores_computed,
        elapsed: start.elapsed(),
    };

    let stats = serde_json::json!({
        "domains_found": result.domains_found,
        "contacts_found": result.contacts_found,
        "audits_ingested": result.audits_ingested,
        "scores_computed": result.scores_computed,
    });
    let _ = store.finish_run(&run_id, &stats.to_string()).await;

    progress.done(&result);
    info!(
        domains = result.domains_found,
        contacts = result.contacts_found,
        audits = result.audits_ingested,
        scores = result.scores_computed,
        elapsed_ms = result.elapsed.as_millis(),
        "pipeline complete"
    );

    Ok(result)
}

/// Harvest contacts for a domain set using the manifest's scrape settings.
async fn harvest_contacts<R: PageRenderer>(
    manifest: &Manifest,
    renderer: R,
    domains: &[leadscout_shared::Domain],
) -> Result<Vec<LeadRecord>> {
    let robots = if manifest.policy.respect_robots {
        RobotsGate::new(&manifest.scrape.user_agent)?
    } else {
        RobotsGate::disabled()
    };

    let harvester = Harvester::new(
        renderer,
        robots,
        HarvestOptions {
            max_pages_per_domain: manifest.scrape.max_pages_per_domain,
            requests_per_second: manifest.policy.rate_limit_rps,
        },
    );

    let contacts = harvester.harvest(domains).await;
    Ok(contacts.into_iter().map(LeadRecord::from_contact).collect())
}

/// Harvest from an existing domains file instead of running discovery.
///
/// Fatal when the domains file is absent. Enriches and persists the result
/// the same way the full pipeline does.
pub async fn harvest_from_file<R: PageRenderer>(
    manifest: &Manifest,
    renderer: R,
) -> Result<Vec<LeadRecord>> {
    let domains = read_domains_file(Path::new(&manifest.io.domains_file))?;

    let leads = harvest_contacts(manifest, renderer, &domains).await?;
    let orchestrator = Orchestrator::from_manifest(manifest)?;
    let leads = orchestrator.run(leads).await;

    write_contacts_csv(&leads, Path::new(&manifest.io.contacts_csv))?;
    let store = LeadStore::open(Path::new(&manifest.io.db_path)).await?;
    store.replace_contacts(&leads).await?;

    Ok(leads)
}

/// Ingest existing audit reports for the domains file, persist them, and
/// recompute scores. Fatal when the domains file is absent.
pub async fn ingest_audits(manifest: &Manifest) -> Result<(usize, Vec<LeadScore>)> {
    let domains = read_domains_file(Path::new(&manifest.io.domains_file))?;

    let rows = audit::collect_audit_rows(Path::new(&manifest.audit.report_dir), &domains);
    write_audits_csv(&rows, Path::new(&manifest.io.audits_csv))?;

    let store = LeadStore::open(Path::new(&manifest.io.db_path)).await?;
    store.replace_audits(&rows).await?;
    let scores = store.compute_scores().await?;

    Ok((rows.len(), scores))
}

/// Reload the audits table from the current audit CSV and recompute scores.
/// Fatal when the CSV is absent.
pub async fn rescore_from_csv(manifest: &Manifest) -> Result<Vec<LeadScore>> {
    let rows = read_audits_csv(Path::new(&manifest.io.audits_csv))?;

    let store = LeadStore::open(Path::new(&manifest.io.db_path)).await?;
    store.replace_audits(&rows).await?;
    store.compute_scores().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use uuid::Uuid;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use leadscout_enrich::WatchlistClient;
    use leadscout_shared::{Domain, IoConfig, LeadScoutError};

    struct StubRenderer {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl PageRenderer for StubRenderer {
        async fn render(&self, url: &str) -> leadscout_shared::Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| LeadScoutError::Browser(format!("{url}: navigation failed")))
        }
    }

    fn temp_manifest() -> Manifest {
        let dir = std::env::temp_dir().join(format!("ls_pipe_{}", Uuid::now_v7()));
        let io = IoConfig {
            output_dir: dir.display().to_string(),
            domains_file: dir.join("domains.txt").display().to_string(),
            contacts_csv: dir.join("contacts.csv").display().to_string(),
            audits_csv: dir.join("audits.csv").display().to_string(),
            db_path: dir.join("leadscout.db").display().to_string(),
        };
        Manifest {
            io,
            ..Manifest::default()
        }
    }

    #[tokio::test]
    async fn disabled_stages_still_complete_successfully() {
        let mut manifest = temp_manifest();
        manifest.scrape.fetch_contacts = false;
        manifest.audit.run_audits = false;

        let renderer = StubRenderer {
            pages: HashMap::new(),
        };
        let result = run_pipeline(&manifest, renderer, &SilentProgress)
            .await
            .expect("pipeline");

        // No keywords, no providers, nothing harvested — still a success.
        assert_eq!(result.domains_found, 0);
        assert_eq!(result.contacts_found, 0);

        // The contacts CSV exists with a header and no data rows.
        let csv = std::fs::read_to_string(&manifest.io.contacts_csv).unwrap();
        assert_eq!(csv.lines().count(), 1);

        let _ = std::fs::remove_dir_all(&manifest.io.output_dir);
    }

    #[tokio::test]
    async fn harvest_from_file_requires_the_domains_file() {
        let manifest = temp_manifest();
        let renderer = StubRenderer {
            pages: HashMap::new(),
        };
        let err = harvest_from_file(&manifest, renderer).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn rescore_requires_the_audits_csv() {
        let manifest = temp_manifest();
        let err = rescore_from_csv(&manifest).await.unwrap_err();
        assert!(err.is_fatal());
    }

    /// End-to-end: two discovered domains, one harvested email, a watchlist
    /// hit for the contactful domain, and a provider outage for the other.
    #[tokio::test]
    async fn end_to_end_scenario() {
        let manifest = temp_manifest();

        // Harvester: a.com's root page has an email, b.com has none.
        let mut pages = HashMap::new();
        pages.insert(
            "https://a.com/".to_string(),
            "<html><body>Say hi: info@a.com</body></html>".to_string(),
        );
        let harvester = Harvester::new(
            StubRenderer { pages },
            RobotsGate::disabled(),
            HarvestOptions {
                max_pages_per_domain: 3,
                requests_per_second: 0.0,
            },
        );

        let domains = vec![
            Domain::from_url("a.com").unwrap(),
            Domain::from_url("b.com").unwrap(),
        ];
        let contacts = harvester.harvest(&domains).await;
        assert_eq!(contacts.len(), 1);

        // Watchlist: a.com scores 0.9 (hit); b.com's provider times out.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "a.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"score": 0.9}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "b.com"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let watchlist = WatchlistClient::new(0.85, 0.0)
            .unwrap()
            .with_base_url(server.uri());
        let orchestrator = Orchestrator::new(None, None, Some(watchlist));

        let leads = orchestrator
            .run(contacts.into_iter().map(LeadRecord::from_contact).collect())
            .await;

        let store = LeadStore::open(Path::new(&manifest.io.db_path)).await.unwrap();
        store.replace_contacts(&leads).await.unwrap();

        // One row for a.com, flagged; b.com has no row at all — its
        // compliance state is absent, not zero-valued.
        let stored = store.list_contacts().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].contact.domain.as_str(), "a.com");
        assert_eq!(stored[0].contact.email, "info@a.com");
        assert!(stored[0].watchlist.unwrap().is_hit());
        assert!(!stored.iter().any(|r| r.contact.domain.as_str() == "b.com"));

        let _ = std::fs::remove_dir_all(&manifest.io.output_dir);
    }
}
