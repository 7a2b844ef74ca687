//! On-screen banner and clinic highlight for an announcement.

use std::time::Duration;

use nidaa_core::models::{Announcement, AnnouncementKind, Clinic};

use crate::phrases::{ticket_notice, CLINIC_FALLBACK_NAME, RECORDING_NOTICE, RESET_NOTICE};

/// What the display shows, and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCue {
    pub message: String,
    /// Clinic row to flash, for ticket calls
    pub highlight_clinic: Option<String>,
    pub duration: Duration,
}

impl DisplayCue {
    pub const TICKET_DURATION: Duration = Duration::from_secs(10);
    pub const CUSTOM_DURATION: Duration = Duration::from_secs(15);
    pub const RECORDING_DURATION: Duration = Duration::from_secs(10);
    pub const RESET_DURATION: Duration = Duration::from_secs(5);

    /// Build the cue, or `None` for custom text or recordings with an empty
    /// payload.
    pub fn for_announcement(announcement: &Announcement, clinics: &[Clinic]) -> Option<Self> {
        match &announcement.kind {
            AnnouncementKind::Ticket {
                clinic_id,
                ticket_number,
            } => {
                let name = clinics
                    .iter()
                    .find(|c| &c.id == clinic_id)
                    .map(|c| c.name.as_str())
                    .unwrap_or(CLINIC_FALLBACK_NAME);
                Some(Self {
                    message: ticket_notice(*ticket_number, name),
                    highlight_clinic: Some(clinic_id.clone()),
                    duration: Self::TICKET_DURATION,
                })
            }
            AnnouncementKind::Custom { text } if !text.is_empty() => Some(Self {
                message: text.clone(),
                highlight_clinic: None,
                duration: Self::CUSTOM_DURATION,
            }),
            AnnouncementKind::Recording { audio_blob_url } if !audio_blob_url.is_empty() => {
                Some(Self {
                    message: RECORDING_NOTICE.to_string(),
                    highlight_clinic: None,
                    duration: Self::RECORDING_DURATION,
                })
            }
            AnnouncementKind::Reset { text, .. } => Some(Self {
                message: text
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .unwrap_or(RESET_NOTICE)
                    .to_string(),
                highlight_clinic: None,
                duration: Self::RESET_DURATION,
            }),
            _ => None,
        }
    }
}
