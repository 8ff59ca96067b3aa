//! CSV outputs for contacts and audits.
//!
//! Files always carry a header row, even with zero data rows. Writes go to a
//! temp file in the destination directory and are renamed into place, so a
//! reader never sees a partial file.

use std::collections::BTreeSet;
use std::path::Path;

use csv::StringRecord;

use leadscout_shared::{AuditRow, LeadRecord, LeadScoutError, Result};

/// Fixed contact columns; feature columns are appended after these.
pub const CONTACT_BASE_COLUMNS: [&str; 19] = [
    "domain",
    "page_url",
    "email",
    "clearbit_name",
    "clearbit_domain",
    "clearbit_site",
    "clearbit_employees",
    "clearbit_employees_range",
    "clearbit_raised",
    "clearbit_sector",
    "clearbit_industry",
    "clearbit_subindustry",
    "clearbit_tags",
    "clearbit_logo",
    "clearbit_twitter",
    "clearbit_linkedin",
    "os_match_score",
    "os_sanctioned",
    "enriched",
];

/// Audit CSV columns.
pub const AUDIT_COLUMNS: [&str; 9] = [
    "domain",
    "page_url",
    "performance",
    "seo",
    "best_practices",
    "accessibility",
    "lcp_ms",
    "cls",
    "inp_ms",
];

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

/// Write the contacts CSV: fixed columns plus the sorted union of feature
/// columns present across all rows.
pub fn write_contacts_csv(rows: &[LeadRecord], path: &Path) -> Result<()> {
    let feature_columns: BTreeSet<String> = rows
        .iter()
        .flat_map(|r| r.features.keys().cloned())
        .collect();

    let mut header: Vec<&str> = CONTACT_BASE_COLUMNS.to_vec();
    header.extend(feature_columns.iter().map(String::as_str));

    write_atomic(path, &header, rows.iter(), |row| {
        let company = row.company.clone().unwrap_or_default();
        let mut record = vec![
            row.contact.domain.as_str().to_string(),
            row.contact.page_url.clone(),
            row.contact.email.clone(),
            opt_text(&company.name),
            opt_text(&company.domain),
            opt_text(&company.site),
            opt_num(&company.employees),
            opt_text(&company.employees_range),
            opt_num(&company.raised),
            opt_text(&company.sector),
            opt_text(&company.industry),
            opt_text(&company.subindustry),
            opt_text(&company.tags),
            opt_text(&company.logo),
            opt_text(&company.twitter),
            opt_text(&company.linkedin),
            opt_num(&row.watchlist.and_then(|w| w.score())),
            row.watchlist
                .map(|w| if w.is_hit() { "true" } else { "false" })
                .unwrap_or("")
                .to_string(),
            if row.enriched { "true" } else { "" }.to_string(),
        ];
        for column in &feature_columns {
            record.push(row.features.get(column).cloned().unwrap_or_default());
        }
        record
    })
}

// ---------------------------------------------------------------------------
// Audits
// ---------------------------------------------------------------------------

/// Write the audits CSV.
pub fn write_audits_csv(rows: &[AuditRow], path: &Path) -> Result<()> {
    write_atomic(path, &AUDIT_COLUMNS, rows.iter(), |row| {
        vec![
            row.domain.clone(),
            row.page_url.clone(),
            opt_num(&row.performance),
            opt_num(&row.seo),
            opt_num(&row.best_practices),
            opt_num(&row.accessibility),
            opt_num(&row.lcp_ms),
            opt_num(&row.cls),
            opt_num(&row.inp_ms),
        ]
    })
}

/// Read an audits CSV back into rows. Missing or non-numeric metric values
/// become `None`.
///
/// A missing file is fatal: the audit CSV is a required input for scoring.
pub fn read_audits_csv(path: &Path) -> Result<Vec<AuditRow>> {
    if !path.exists() {
        return Err(LeadScoutError::missing_artifact(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| LeadScoutError::parse(format!("{}: {e}", path.display())))?;
    let headers = reader
        .headers()
        .map_err(|e| LeadScoutError::parse(format!("{}: {e}", path.display())))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let columns: Vec<Option<usize>> = AUDIT_COLUMNS.iter().map(|name| column(name)).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| LeadScoutError::parse(format!("{}: {e}", path.display())))?;
        let text = |i: usize| field(&record, columns[i]).unwrap_or_default().to_string();
        let metric = |i: usize| {
            field(&record, columns[i]).and_then(|value| value.trim().parse::<f64>().ok())
        };

        rows.push(AuditRow {
            domain: text(0),
            page_url: text(1),
            performance: metric(2),
            seo: metric(3),
            best_practices: metric(4),
            accessibility: metric(5),
            lcp_ms: metric(6),
            cls: metric(7),
            inp_ms: metric(8),
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn field<'a>(record: &'a StringRecord, idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| record.get(i))
}

fn opt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_num<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(T::to_string).unwrap_or_default()
}

/// Write header + rows to a temp file, then rename over the destination.
fn write_atomic<'a, R: 'a>(
    path: &Path,
    header: &[&str],
    rows: impl Iterator<Item = &'a R>,
    to_record: impl Fn(&R) -> Vec<String>,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LeadScoutError::io(parent, e))?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp).map_err(|e| {
            LeadScoutError::Storage(format!("csv open {}: {e}", tmp.display()))
        })?;
        writer
            .write_record(header)
            .map_err(|e| LeadScoutError::Storage(format!("csv header: {e}")))?;
        for row in rows {
            writer
                .write_record(to_record(row))
                .map_err(|e| LeadScoutError::Storage(format!("csv row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| LeadScoutError::io(&tmp, e))?;
    }
    std::fs::rename(&tmp, path).map_err(|e| LeadScoutError::io(path, e))
}
