//! The "last announcement" command value broadcast to display views.

use serde::{Deserialize, Serialize};

/// Spoken text for a single-clinic reset.
pub const QUEUE_RESET_TEXT: &str = "تمت إعادة تعيين الطابور";
/// Spoken text for a reset of every clinic.
pub const ALL_QUEUES_RESET_TEXT: &str = "تمت إعادة تعيين جميع العيادات";

/// A queue event to be announced. Only the most recent one is kept.
///
/// `timestamp` is the de-duplication key: a view replays an announcement
/// only if its timestamp is greater than the last one it processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Announcement {
    #[serde(flatten)]
    pub kind: AnnouncementKind,
    pub timestamp: i64,
}

/// Announcement payload, serialized with a `type` discriminator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnouncementKind {
    /// Call a ticket number to a clinic
    #[serde(rename_all = "camelCase")]
    Ticket { clinic_id: String, ticket_number: u32 },
    /// Free text spoken via speech synthesis
    Custom { text: String },
    /// A previously captured audio clip
    #[serde(rename_all = "camelCase")]
    Recording { audio_blob_url: String },
    /// Queue reset, scoped to one clinic or global when `clinic_id` is absent
    #[serde(rename_all = "camelCase")]
    Reset {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clinic_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl Announcement {
    pub fn ticket(clinic_id: impl Into<String>, ticket_number: u32, timestamp: i64) -> Self {
        Self {
            kind: AnnouncementKind::Ticket {
                clinic_id: clinic_id.into(),
                ticket_number,
            },
            timestamp,
        }
    }

    pub fn custom(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            kind: AnnouncementKind::Custom { text: text.into() },
            timestamp,
        }
    }

    pub fn recording(audio_blob_url: impl Into<String>, timestamp: i64) -> Self {
        Self {
            kind: AnnouncementKind::Recording {
                audio_blob_url: audio_blob_url.into(),
            },
            timestamp,
        }
    }

    pub fn reset(clinic_id: Option<String>, text: Option<String>, timestamp: i64) -> Self {
        Self {
            kind: AnnouncementKind::Reset { clinic_id, text },
            timestamp,
        }
    }

    /// Wire name of the announcement type.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            AnnouncementKind::Ticket { .. } => "ticket",
            AnnouncementKind::Custom { .. } => "custom",
            AnnouncementKind::Recording { .. } => "recording",
            AnnouncementKind::Reset { .. } => "reset",
        }
    }

    /// Clinic this announcement is scoped to, if any.
    pub fn clinic_id(&self) -> Option<&str> {
        match &self.kind {
            AnnouncementKind::Ticket { clinic_id, .. } => Some(clinic_id),
            AnnouncementKind::Reset { clinic_id, .. } => clinic_id.as_deref(),
            _ => None,
        }
    }
}
