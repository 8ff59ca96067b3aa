//! libSQL persistence layer for LeadScout.
//!
//! The [`LeadStore`] wraps a local libSQL database holding contacts (with
//! their enrichment fields), audit rows, derived lead scores, and pipeline
//! run history.
//!
//! **Write semantics:** contacts and audits are *full-replace* tables — each
//! run's write discards the prior contents inside one transaction, so readers
//! never observe a partial state. Lead scores are derived state, recomputed
//! wholesale from the audits table on every scoring run.

mod csvio;
mod migrations;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use uuid::Uuid;

use leadscout_shared::{
    AuditRow, CompanyProfile, ContactRecord, Domain, LeadRecord, LeadScore, LeadScoutError,
    Priority, Result, WatchlistStatus,
};

pub use csvio::{
    AUDIT_COLUMNS, CONTACT_BASE_COLUMNS, read_audits_csv, write_audits_csv, write_contacts_csv,
};

/// Primary storage handle wrapping a libSQL database.
pub struct LeadStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl LeadStore {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LeadScoutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        LeadScoutError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Transaction helpers
    // -----------------------------------------------------------------------

    async fn begin(&self) -> Result<()> {
        self.conn
            .execute("BEGIN IMMEDIATE", params![])
            .await
            .map(|_| ())
            .map_err(|e| LeadScoutError::Storage(e.to_string()))
    }

    async fn commit(&self) -> Result<()> {
        self.conn
            .execute("COMMIT", params![])
            .await
            .map(|_| ())
            .map_err(|e| LeadScoutError::Storage(e.to_string()))
    }

    async fn rollback(&self) {
        let _ = self.conn.execute("ROLLBACK", params![]).await;
    }

    // -----------------------------------------------------------------------
    // Contacts
    // -----------------------------------------------------------------------

    /// Replace the contacts table with the current run's merged rows.
    ///
    /// Rows for domains absent from `rows` are discarded — this is a full
    /// replace, not a patch.
    pub async fn replace_contacts(&self, rows: &[LeadRecord]) -> Result<()> {
        self.begin().await?;
        match self.write_contacts(rows).await {
            Ok(()) => self.commit().await,
            Err(e) => {
                self.rollback().await;
                Err(e)
            }
        }
    }

    async fn write_contacts(&self, rows: &[LeadRecord]) -> Result<()> {
        self.conn
            .execute("DELETE FROM contacts", params![])
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        for row in rows {
            let company = row.company.clone().unwrap_or_default();
            let features_json = if row.features.is_empty() {
                None
            } else {
                Some(
                    serde_json::to_string(&row.features)
                        .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
                )
            };
            let os_match_score = row.watchlist.and_then(|w| w.score());
            let os_sanctioned = row
                .watchlist
                .map(|w| if w.is_hit() { "true" } else { "false" });

            self.conn
                .execute(
                    "INSERT INTO contacts (
                        domain, page_url, email,
                        clearbit_name, clearbit_domain, clearbit_site,
                        clearbit_employees, clearbit_employees_range, clearbit_raised,
                        clearbit_sector, clearbit_industry, clearbit_subindustry,
                        clearbit_tags, clearbit_logo, clearbit_twitter, clearbit_linkedin,
                        os_match_score, os_sanctioned, enriched, features_json
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                               ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
                    params![
                        row.contact.domain.as_str(),
                        row.contact.page_url.as_str(),
                        row.contact.email.as_str(),
                        company.name.as_deref(),
                        company.domain.as_deref(),
                        company.site.as_deref(),
                        company.employees,
                        company.employees_range.as_deref(),
                        company.raised,
                        company.sector.as_deref(),
                        company.industry.as_deref(),
                        company.subindustry.as_deref(),
                        company.tags.as_deref(),
                        company.logo.as_deref(),
                        company.twitter.as_deref(),
                        company.linkedin.as_deref(),
                        os_match_score,
                        os_sanctioned,
                        if row.enriched { Some("true") } else { None },
                        features_json.as_deref(),
                    ],
                )
                .await
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    /// All contact rows, ordered by domain then email.
    pub async fn list_contacts(&self) -> Result<Vec<LeadRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT domain, page_url, email,
                        clearbit_name, clearbit_domain, clearbit_site,
                        clearbit_employees, clearbit_employees_range, clearbit_raised,
                        clearbit_sector, clearbit_industry, clearbit_subindustry,
                        clearbit_tags, clearbit_logo, clearbit_twitter, clearbit_linkedin,
                        os_match_score, os_sanctioned, enriched, features_json
                 FROM contacts ORDER BY domain, email",
                params![],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_lead(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Audits
    // -----------------------------------------------------------------------

    /// Replace the audits table with the current run's rows.
    pub async fn replace_audits(&self, rows: &[AuditRow]) -> Result<()> {
        self.begin().await?;
        match self.write_audits(rows).await {
            Ok(()) => self.commit().await,
            Err(e) => {
                self.rollback().await;
                Err(e)
            }
        }
    }

    async fn write_audits(&self, rows: &[AuditRow]) -> Result<()> {
        self.conn
            .execute("DELETE FROM audits", params![])
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        for row in rows {
            self.conn
                .execute(
                    "INSERT INTO audits (
                        domain, page_url, performance, seo, best_practices,
                        accessibility, lcp_ms, cls, inp_ms
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        row.domain.as_str(),
                        row.page_url.as_str(),
                        row.performance,
                        row.seo,
                        row.best_practices,
                        row.accessibility,
                        row.lcp_ms,
                        row.cls,
                        row.inp_ms,
                    ],
                )
                .await
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    /// All audit rows, ordered by domain then page URL.
    pub async fn list_audits(&self) -> Result<Vec<AuditRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT domain, page_url, performance, seo, best_practices,
                        accessibility, lcp_ms, cls, inp_ms
                 FROM audits ORDER BY domain, page_url",
                params![],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(AuditRow {
                domain: row
                    .get::<String>(0)
                    .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
                page_url: row
                    .get::<String>(1)
                    .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
                performance: row.get::<f64>(2).ok(),
                seo: row.get::<f64>(3).ok(),
                best_practices: row.get::<f64>(4).ok(),
                accessibility: row.get::<f64>(5).ok(),
                lcp_ms: row.get::<f64>(6).ok(),
                cls: row.get::<f64>(7).ok(),
                inp_ms: row.get::<f64>(8).ok(),
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    /// Recompute the lead-score table from the audits table.
    ///
    /// Category metrics are averaged per domain with missing values treated
    /// as 0, then weighted into an improvement-opportunity score:
    /// `0.4*(100-perf) + 0.3*(100-seo) + 0.2*(100-bp) + 0.1*(100-a11y)`.
    /// The score table is rewritten wholesale; domains with no audit rows
    /// never get a score row.
    pub async fn compute_scores(&self) -> Result<Vec<LeadScore>> {
        let mut rows = self
            .conn
            .query(
                "SELECT domain,
                        AVG(COALESCE(performance, 0)),
                        AVG(COALESCE(seo, 0)),
                        AVG(COALESCE(best_practices, 0)),
                        AVG(COALESCE(accessibility, 0))
                 FROM audits
                 GROUP BY domain
                 ORDER BY domain",
                params![],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let mut scores = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let domain: String = row
                .get(0)
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
            let perf: f64 = row.get(1).unwrap_or(0.0);
            let seo: f64 = row.get(2).unwrap_or(0.0);
            let bp: f64 = row.get(3).unwrap_or(0.0);
            let a11y: f64 = row.get(4).unwrap_or(0.0);

            let score = 0.4 * (100.0 - perf)
                + 0.3 * (100.0 - seo)
                + 0.2 * (100.0 - bp)
                + 0.1 * (100.0 - a11y);

            scores.push(LeadScore {
                domain,
                score,
                priority: Priority::from_score(score),
            });
        }

        self.begin().await?;
        match self.write_scores(&scores).await {
            Ok(()) => self.commit().await?,
            Err(e) => {
                self.rollback().await;
                return Err(e);
            }
        }

        tracing::info!(scores = scores.len(), "lead scores recomputed");
        Ok(scores)
    }

    async fn write_scores(&self, scores: &[LeadScore]) -> Result<()> {
        self.conn
            .execute("DELETE FROM lead_scores", params![])
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        for score in scores {
            self.conn
                .execute(
                    "INSERT OR REPLACE INTO lead_scores (domain, score, priority)
                     VALUES (?1, ?2, ?3)",
                    params![score.domain.as_str(), score.score, score.priority.as_str()],
                )
                .await
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    /// All score rows, ordered by domain.
    pub async fn list_scores(&self) -> Result<Vec<LeadScore>> {
        let mut rows = self
            .conn
            .query(
                "SELECT domain, score, priority FROM lead_scores ORDER BY domain",
                params![],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let domain: String = row
                .get(0)
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
            let score: f64 = row.get(1).unwrap_or(0.0);
            let priority: String = row
                .get(2)
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
            let priority = match priority.as_str() {
                "high" => Priority::High,
                "medium" => Priority::Medium,
                _ => Priority::Low,
            };
            results.push(LeadScore {
                domain,
                score,
                priority,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Pipeline run history
    // -----------------------------------------------------------------------

    /// Record the start of a pipeline run. Returns the generated run id.
    pub async fn insert_run(&self) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO pipeline_runs (id, started_at) VALUES (?1, ?2)",
                params![id.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Mark a pipeline run finished with summary stats.
    pub async fn finish_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE pipeline_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Convert a contacts row back to a [`LeadRecord`].
fn row_to_lead(row: &libsql::Row) -> Result<LeadRecord> {
    let domain_str: String = row
        .get(0)
        .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
    let domain = Domain::from_url(&domain_str)
        .ok_or_else(|| LeadScoutError::Storage(format!("invalid domain in store: {domain_str}")))?;

    let company = CompanyProfile {
        name: row.get::<String>(3).ok(),
        domain: row.get::<String>(4).ok(),
        site: row.get::<String>(5).ok(),
        employees: row.get::<i64>(6).ok(),
        employees_range: row.get::<String>(7).ok(),
        raised: row.get::<f64>(8).ok(),
        sector: row.get::<String>(9).ok(),
        industry: row.get::<String>(10).ok(),
        subindustry: row.get::<String>(11).ok(),
        tags: row.get::<String>(12).ok(),
        logo: row.get::<String>(13).ok(),
        twitter: row.get::<String>(14).ok(),
        linkedin: row.get::<String>(15).ok(),
    };
    let company = (company != CompanyProfile::default()).then_some(company);

    let os_match_score = row.get::<f64>(16).ok();
    let watchlist = row
        .get::<String>(17)
        .ok()
        .map(|sanctioned| WatchlistStatus::Screened {
            score: os_match_score,
            hit: sanctioned == "true",
        });

    let features: BTreeMap<String, String> = row
        .get::<String>(19)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default();

    Ok(LeadRecord {
        contact: ContactRecord {
            domain,
            page_url: row
                .get::<String>(1)
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
            email: row
                .get::<String>(2)
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
        },
        company,
        features,
        enriched: row.get::<String>(18).ok().as_deref() == Some("true"),
        watchlist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a temp file store for testing.
    async fn test_store() -> LeadStore {
        let tmp = std::env::temp_dir().join(format!("ls_test_{}.db", Uuid::now_v7()));
        LeadStore::open(&tmp).await.expect("open test db")
    }

    fn contact(host: &str, email: &str) -> LeadRecord {
        LeadRecord::from_contact(ContactRecord {
            domain: Domain::from_url(host).unwrap(),
            page_url: format!("https://{host}/"),
            email: email.into(),
        })
    }

    fn audit(domain: &str, perf: f64, seo: f64, bp: f64, a11y: f64) -> AuditRow {
        AuditRow {
            domain: domain.into(),
            page_url: format!("https://{domain}"),
            performance: Some(perf),
            seo: Some(seo),
            best_practices: Some(bp),
            accessibility: Some(a11y),
            lcp_ms: Some(2100.0),
            cls: Some(0.08),
            inp_ms: None,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("ls_test_{}.db", Uuid::now_v7()));
        let first = LeadStore::open(&tmp).await.expect("first open");
        drop(first);
        let second = LeadStore::open(&tmp).await.expect("second open");
        assert_eq!(second.schema_version().await, 1);
    }

    #[tokio::test]
    async fn contacts_full_replace_discards_prior_rows() {
        let store = test_store().await;

        store
            .replace_contacts(&[contact("a.com", "x@a.com"), contact("b.com", "y@b.com")])
            .await
            .expect("first replace");
        assert_eq!(store.list_contacts().await.unwrap().len(), 2);

        // Second run only found c.com — a.com and b.com must be gone.
        store
            .replace_contacts(&[contact("c.com", "z@c.com")])
            .await
            .expect("second replace");

        let contacts = store.list_contacts().await.unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].contact.domain.as_str(), "c.com");
    }

    #[tokio::test]
    async fn enriched_contact_roundtrip() {
        let store = test_store().await;

        let mut record = contact("a.com", "info@a.com");
        record.company = Some(CompanyProfile {
            name: Some("A Corp".into()),
            employees: Some(12),
            raised: Some(250_000.0),
            tags: Some("b2b,saas".into()),
            ..CompanyProfile::default()
        });
        record
            .features
            .insert("feat_rank".into(), "42".into());
        record.enriched = true;
        record.watchlist = Some(WatchlistStatus::Screened {
            score: Some(0.9),
            hit: true,
        });

        store.replace_contacts(&[record]).await.expect("replace");

        let stored = &store.list_contacts().await.unwrap()[0];
        let company = stored.company.as_ref().expect("company");
        assert_eq!(company.name.as_deref(), Some("A Corp"));
        assert_eq!(company.employees, Some(12));
        assert_eq!(stored.features.get("feat_rank").map(String::as_str), Some("42"));
        assert!(stored.enriched);
        assert!(stored.watchlist.unwrap().is_hit());
        assert_eq!(stored.watchlist.unwrap().score(), Some(0.9));
    }

    #[tokio::test]
    async fn unenriched_contact_keeps_fields_absent() {
        let store = test_store().await;
        store
            .replace_contacts(&[contact("plain.com", "x@plain.com")])
            .await
            .unwrap();

        let stored = &store.list_contacts().await.unwrap()[0];
        assert!(stored.company.is_none());
        assert!(stored.watchlist.is_none());
        assert!(!stored.enriched);
        assert!(stored.features.is_empty());
    }

    #[tokio::test]
    async fn scoring_is_deterministic() {
        let store = test_store().await;
        store
            .replace_audits(&[audit("a.com", 90.0, 80.0, 70.0, 60.0)])
            .await
            .unwrap();

        let scores = store.compute_scores().await.expect("compute");
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].domain, "a.com");
        // 0.4*10 + 0.3*20 + 0.2*30 + 0.1*40 = 20
        assert!((scores[0].score - 20.0).abs() < 1e-9);
        assert_eq!(scores[0].priority, Priority::Medium);
    }

    #[tokio::test]
    async fn scores_average_across_pages_and_treat_missing_as_zero() {
        let store = test_store().await;
        let mut no_perf = audit("a.com", 0.0, 100.0, 100.0, 100.0);
        no_perf.performance = None;
        store
            .replace_audits(&[no_perf, audit("a.com", 100.0, 100.0, 100.0, 100.0)])
            .await
            .unwrap();

        let scores = store.compute_scores().await.unwrap();
        // Missing performance averaged as 0 → perf = 50 → score = 0.4*50 = 20.
        assert!((scores[0].score - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn domain_without_audits_gets_no_score_row() {
        let store = test_store().await;
        store
            .replace_contacts(&[contact("unaudited.com", "x@unaudited.com")])
            .await
            .unwrap();
        store
            .replace_audits(&[audit("audited.com", 50.0, 50.0, 50.0, 50.0)])
            .await
            .unwrap();

        let scores = store.compute_scores().await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].domain, "audited.com");
    }

    #[tokio::test]
    async fn score_table_is_rewritten_wholesale() {
        let store = test_store().await;
        store
            .replace_audits(&[audit("old.com", 10.0, 10.0, 10.0, 10.0)])
            .await
            .unwrap();
        store.compute_scores().await.unwrap();

        store
            .replace_audits(&[audit("new.com", 10.0, 10.0, 10.0, 10.0)])
            .await
            .unwrap();
        store.compute_scores().await.unwrap();

        let scores = store.list_scores().await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].domain, "new.com");
        assert_eq!(scores[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn pipeline_run_lifecycle() {
        let store = test_store().await;
        let run_id = store.insert_run().await.expect("insert run");
        assert!(!run_id.is_empty());
        store
            .finish_run(&run_id, r#"{"contacts": 3}"#)
            .await
            .expect("finish run");
    }
}
