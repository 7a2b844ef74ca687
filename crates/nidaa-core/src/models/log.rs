//! Activity log entries used for daily reporting.

use serde::{Deserialize, Serialize};

/// Maximum number of log entries kept in the document.
pub const LOG_CAPACITY: usize = 1000;

/// What happened to a ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogKind {
    /// Printed by a kiosk
    Issue,
    /// Called by staff
    Serve,
}

/// Immutable record of a ticket being issued or served.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub clinic_id: String,
    pub ticket_number: u32,
    pub timestamp: i64,
}

impl LogEntry {
    pub fn new(kind: LogKind, clinic_id: impl Into<String>, ticket_number: u32, timestamp: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            clinic_id: clinic_id.into(),
            ticket_number,
            timestamp,
        }
    }
}

/// Append to a capped log, evicting the oldest entries first.
pub fn append_capped(logs: &mut Vec<LogEntry>, entry: LogEntry, capacity: usize) {
    logs.push(entry);
    if logs.len() > capacity {
        let excess = logs.len() - capacity;
        logs.drain(..excess);
    }
}
