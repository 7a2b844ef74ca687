//! Root aggregate persisted by the state store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::announcement::Announcement;
use super::clinic::{seed_clinics, Clinic, PublicClinic};
use super::log::{append_capped, LogEntry, LOG_CAPACITY};
use super::settings::AppSettings;

/// Everything the views share: clinics, settings, last announcement and log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub clinics: Vec<Clinic>,
    pub settings: AppSettings,
    pub last_announcement: Option<Announcement>,
    pub logs: Vec<LogEntry>,
}

impl Default for Document {
    /// Seeded document used on first start.
    fn default() -> Self {
        Self {
            clinics: seed_clinics(),
            settings: AppSettings::default(),
            last_announcement: None,
            logs: Vec::new(),
        }
    }
}

impl Document {
    pub fn clinic(&self, clinic_id: &str) -> Option<&Clinic> {
        self.clinics.iter().find(|c| c.id == clinic_id)
    }

    pub fn clinic_mut(&mut self, clinic_id: &str) -> Option<&mut Clinic> {
        self.clinics.iter_mut().find(|c| c.id == clinic_id)
    }

    /// Credential-free view of every clinic.
    pub fn public_clinics(&self) -> Vec<PublicClinic> {
        self.clinics.iter().map(PublicClinic::from).collect()
    }

    /// Append a log entry with the default capacity.
    pub fn append_log(&mut self, entry: LogEntry) {
        append_capped(&mut self.logs, entry, LOG_CAPACITY);
    }

    /// Timestamp for a new announcement, strictly after the current one.
    pub fn next_announcement_timestamp(&self, now: i64) -> i64 {
        match &self.last_announcement {
            Some(last) if last.timestamp >= now => last.timestamp + 1,
            _ => now,
        }
    }
}

/// Upgrade a legacy document in place.
///
/// Documents written before the activity log existed have no `logs` field and
/// no `ticketsIssued` per clinic. Returns `true` if anything was changed.
pub fn migrate_legacy(doc: &mut Value) -> bool {
    let Some(obj) = doc.as_object_mut() else {
        return false;
    };
    if obj.contains_key("logs") {
        return false;
    }

    obj.insert("logs".into(), Value::Array(Vec::new()));
    if let Some(Value::Array(clinics)) = obj.get_mut("clinics") {
        for clinic in clinics.iter_mut().filter_map(Value::as_object_mut) {
            let current = clinic.get("currentNumber").cloned().unwrap_or(Value::from(0));
            clinic.insert("ticketsIssued".into(), current);
        }
    }
    true
}
