//! SQL migration definitions for the LeadScout database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: contacts, audits, lead_scores, pipeline_runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Harvested contacts with accreted enrichment fields.
-- Fully replaced from the current run's merged rows.
CREATE TABLE IF NOT EXISTS contacts (
    domain                  TEXT NOT NULL,
    page_url                TEXT NOT NULL,
    email                   TEXT NOT NULL,
    clearbit_name           TEXT,
    clearbit_domain         TEXT,
    clearbit_site           TEXT,
    clearbit_employees      INTEGER,
    clearbit_employees_range TEXT,
    clearbit_raised         REAL,
    clearbit_sector         TEXT,
    clearbit_industry       TEXT,
    clearbit_subindustry    TEXT,
    clearbit_tags           TEXT,
    clearbit_logo           TEXT,
    clearbit_twitter        TEXT,
    clearbit_linkedin       TEXT,
    os_match_score          REAL,
    os_sanctioned           TEXT,
    enriched                TEXT,
    features_json           TEXT,
    UNIQUE(domain, email)
);

CREATE INDEX IF NOT EXISTS idx_contacts_domain ON contacts(domain);

-- One row per audited page. Fully replaced from the current audit CSV.
CREATE TABLE IF NOT EXISTS audits (
    domain         TEXT NOT NULL,
    page_url       TEXT NOT NULL,
    performance    REAL,
    seo            REAL,
    best_practices REAL,
    accessibility  REAL,
    lcp_ms         REAL,
    cls            REAL,
    inp_ms         REAL
);

CREATE INDEX IF NOT EXISTS idx_audits_domain ON audits(domain);

-- Derived scores, recomputed wholesale each scoring run.
CREATE TABLE IF NOT EXISTS lead_scores (
    domain   TEXT PRIMARY KEY,
    score    REAL NOT NULL,
    priority TEXT NOT NULL
);

-- Pipeline run history
CREATE TABLE IF NOT EXISTS pipeline_runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
