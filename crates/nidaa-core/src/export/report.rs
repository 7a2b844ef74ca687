//! Daily issued/served report built from the activity log.

use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::models::{Document, LogKind};
use crate::store::StateStore;

/// Counts for one clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicReport {
    pub clinic_id: String,
    pub name: String,
    /// Tickets printed
    pub issued: u32,
    /// Numbers called
    pub served: u32,
}

/// Report over every current clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    /// Export timestamp
    pub generated_at: String,
    pub clinics: Vec<ClinicReport>,
}

impl DailyReport {
    /// Count log entries per clinic, in clinic order, stamped `generated_at_millis`.
    ///
    /// Entries for clinics that no longer exist are ignored.
    pub fn from_document(doc: &Document, generated_at_millis: i64) -> Self {
        let mut clinics: Vec<ClinicReport> = doc
            .clinics
            .iter()
            .map(|c| ClinicReport {
                clinic_id: c.id.clone(),
                name: c.name.clone(),
                issued: 0,
                served: 0,
            })
            .collect();

        for entry in &doc.logs {
            if let Some(row) = clinics.iter_mut().find(|r| r.clinic_id == entry.clinic_id) {
                match entry.kind {
                    LogKind::Issue => row.issued += 1,
                    LogKind::Serve => row.served += 1,
                }
            }
        }

        Self {
            generated_at: chrono::DateTime::from_timestamp_millis(generated_at_millis)
                .unwrap_or_default()
                .to_rfc3339(),
            clinics,
        }
    }

    pub fn total_issued(&self) -> u32 {
        self.clinics.iter().map(|c| c.issued).sum()
    }

    pub fn total_served(&self) -> u32 {
        self.clinics.iter().map(|c| c.served).sum()
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("clinic_id,name,issued,served\n");

        for row in &self.clinics {
            csv.push_str(&format!(
                "{},{},{},{}\n",
                escape_csv(&row.clinic_id),
                escape_csv(&row.name),
                row.issued,
                row.served,
            ));
        }

        csv
    }
}

/// Report generator over the shared store.
pub struct ReportExporter<'a> {
    store: &'a StateStore,
}

impl<'a> ReportExporter<'a> {
    pub fn new(store: &'a StateStore) -> Self {
        Self { store }
    }

    /// Build the report from a fresh read, stamped with the store's clock.
    pub fn daily_report(&self) -> DbResult<DailyReport> {
        let doc = self.store.read()?;
        Ok(DailyReport::from_document(&doc, self.store.now_millis()))
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
