//! Clinic models.

use serde::{Deserialize, Serialize};

/// Password assigned to clinics created from the admin panel.
pub const DEFAULT_CLINIC_PASSWORD: &str = "123";

/// A queue lane with its own serving counter and issued-ticket counter.
///
/// This is the full record including the control-panel credential. Views
/// that only display queue state should use [`PublicClinic`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    /// Stable identifier (e.g. "c1")
    pub id: String,
    /// Display name, also used to address the clinic name audio fragment
    pub name: String,
    /// Control panel password
    #[serde(default)]
    pub password: String,
    /// Last number called/served
    pub current_number: u32,
    /// Last ticket number printed by a kiosk
    #[serde(default)]
    pub tickets_issued: u32,
    /// Millisecond timestamp of the last call or reset
    #[serde(default)]
    pub last_called_at: i64,
}

impl Clinic {
    /// Create a clinic with zeroed counters.
    pub fn new(id: impl Into<String>, name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            password: password.into(),
            current_number: 0,
            tickets_issued: 0,
            last_called_at: 0,
        }
    }

    /// Number of issued tickets not yet called.
    ///
    /// A specific call may jump past the issued count, so this saturates at zero.
    pub fn waiting(&self) -> u32 {
        self.tickets_issued.saturating_sub(self.current_number)
    }

    /// Zero both counters.
    pub fn reset_counters(&mut self, now: i64) {
        self.current_number = 0;
        self.tickets_issued = 0;
        self.last_called_at = now;
    }

    /// Password equality check used by the control panel login.
    pub fn password_matches(&self, input: &str) -> bool {
        self.password == input
    }
}

/// Credential-free projection of a [`Clinic`] for display and mobile views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicClinic {
    pub id: String,
    pub name: String,
    pub current_number: u32,
    pub tickets_issued: u32,
    pub last_called_at: i64,
    /// Tickets issued but not yet called
    pub waiting: u32,
}

impl From<&Clinic> for PublicClinic {
    fn from(clinic: &Clinic) -> Self {
        Self {
            id: clinic.id.clone(),
            name: clinic.name.clone(),
            current_number: clinic.current_number,
            tickets_issued: clinic.tickets_issued,
            last_called_at: clinic.last_called_at,
            waiting: clinic.waiting(),
        }
    }
}

/// The clinics a fresh installation starts with.
pub fn seed_clinics() -> Vec<Clinic> {
    vec![
        Clinic::new("c1", "عيادة الباطنية", DEFAULT_CLINIC_PASSWORD),
        Clinic::new("c2", "عيادة الأسنان", DEFAULT_CLINIC_PASSWORD),
        Clinic::new("c3", "عيادة الأطفال", DEFAULT_CLINIC_PASSWORD),
        Clinic::new("c4", "عيادة العيون", DEFAULT_CLINIC_PASSWORD),
    ]
}
