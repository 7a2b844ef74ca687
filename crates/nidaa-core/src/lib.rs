//! Nidaa Core Library
//!
//! Local-first clinic queue management: kiosks issue tickets, staff call
//! numbers, displays announce them, mobile pages mirror status.
//!
//! # Architecture
//!
//! ```text
//!   Kiosk      Control      Admin        Display / Mobile
//!     │           │           │                 ▲
//!     │ issue     │ call      │ edit            │ re-read
//!     ▼           ▼           ▼                 │
//!   ┌───────────────────────────────┐     ┌─────┴──────┐
//!   │        Queue Operations       │     │ Change Bus │
//!   │  read → mutate → write(doc)   │────▶│  (wakeup)  │
//!   └───────────────┬───────────────┘     └────────────┘
//!                   │
//!   ┌───────────────▼───────────────┐
//!   │  State Store (one JSON doc)   │  clinics · settings ·
//!   │  kv_store["nidaa_qms_db"]     │  lastAnnouncement · logs
//!   └───────────────────────────────┘
//!   Lockout records: kv_store["nidaa_lockout_{context}"]
//! ```
//!
//! # Core Principle
//!
//! **Nobody holds the document.** Every operation reads a fresh copy, mutates
//! it and writes it back whole. Writes are last-write-wins.
//!
//! # Modules
//!
//! - [`db`]: SQLite key-value persistence
//! - [`models`]: Domain types (Clinic, AppSettings, Announcement, LogEntry, Document)
//! - [`store`]: State store with legacy migration and change notification
//! - [`bus`]: Payload-free change notification bus
//! - [`lockout`]: Per-context failed-attempt lockout
//! - [`auth`]: Admin and control panel password checks
//! - [`queue`]: Queue operations
//! - [`export`]: Daily report export

pub mod auth;
pub mod bus;
pub mod clock;
pub mod config;
pub mod db;
pub mod export;
pub mod lockout;
pub mod logging;
pub mod models;
pub mod queue;
pub mod store;

// Re-export commonly used types
pub use auth::{AuthOutcome, Authenticator};
pub use bus::{ChangeBus, Subscription};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use db::{Database, DbError, DbResult};
pub use export::{ClinicReport, DailyReport, ReportExporter};
pub use lockout::{LockoutGuard, LockoutPolicy, LockoutStatus};
pub use models::{
    Announcement, AnnouncementKind, AppSettings, AudioMode, Clinic, Document, LogEntry, LogKind,
    PublicClinic, SettingsPatch,
};
pub use queue::QueueService;
pub use store::StateStore;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum NidaaError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<DbError> for NidaaError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Json(e) => NidaaError::SerializationError(e.to_string()),
            other => NidaaError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for NidaaError {
    fn from(e: serde_json::Error) -> Self {
        NidaaError::SerializationError(e.to_string())
    }
}

impl From<config::ConfigError> for NidaaError {
    fn from(e: config::ConfigError) -> Self {
        NidaaError::ConfigError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a queue database at the given path.
#[uniffi::export]
pub fn open_queue(path: String) -> Result<Arc<NidaaCore>, NidaaError> {
    let config = CoreConfig {
        db_path: Some(path.into()),
        ..CoreConfig::default()
    };
    Ok(Arc::new(NidaaCore::with_config(&config)?))
}

/// Open a queue database configured from `NIDAA_*` environment variables.
#[uniffi::export]
pub fn open_queue_from_env() -> Result<Arc<NidaaCore>, NidaaError> {
    let config = CoreConfig::from_env()?;
    Ok(Arc::new(NidaaCore::with_config(&config)?))
}

/// Create an in-memory queue (for testing).
#[uniffi::export]
pub fn open_queue_in_memory() -> Result<Arc<NidaaCore>, NidaaError> {
    Ok(Arc::new(NidaaCore::with_config(&CoreConfig::default())?))
}

/// Install the tracing subscriber. Safe to call more than once.
#[uniffi::export]
pub fn init_logging(level: String) -> bool {
    logging::init_logging(&level)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe queue handle for FFI.
#[derive(uniffi::Object)]
pub struct NidaaCore {
    queue: QueueService,
    auth: Authenticator,
}

impl NidaaCore {
    /// Build from configuration (Rust callers).
    pub fn with_config(config: &CoreConfig) -> Result<Self, NidaaError> {
        let db = match &config.db_path {
            Some(path) => Database::open(path)?,
            None => Database::open_in_memory()?,
        };
        let store = Arc::new(StateStore::new(db)?);
        Ok(Self::from_store(store, config))
    }

    /// Build over an existing store, e.g. one shared with an announcement listener.
    pub fn from_store(store: Arc<StateStore>, config: &CoreConfig) -> Self {
        let guard = LockoutGuard::with_policy(store.clone(), config.lockout);
        Self {
            queue: QueueService::with_log_capacity(store.clone(), config.log_capacity),
            auth: Authenticator::new(store, guard),
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        self.queue.store()
    }
}

#[uniffi::export]
impl NidaaCore {
    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Credential-free clinic list.
    pub fn get_clinics(&self) -> Result<Vec<FfiClinic>, NidaaError> {
        let clinics = self.queue.public_clinics()?;
        Ok(clinics.into_iter().map(|c| c.into()).collect())
    }

    /// Current settings.
    pub fn get_settings(&self) -> Result<FfiSettings, NidaaError> {
        Ok(self.queue.settings()?.into())
    }

    /// The most recent announcement, if any.
    pub fn last_announcement(&self) -> Result<Option<FfiAnnouncement>, NidaaError> {
        let doc = self.store().read()?;
        Ok(doc.last_announcement.map(|a| a.into()))
    }

    /// Pick up writes made by other processes; returns whether any were seen.
    pub fn refresh(&self) -> Result<bool, NidaaError> {
        Ok(self.store().refresh()?)
    }

    // =========================================================================
    // Queue Operations
    // =========================================================================

    /// Issue a ticket. Returns `None` for an unknown clinic.
    pub fn issue_ticket(&self, clinic_id: String) -> Result<Option<u32>, NidaaError> {
        Ok(self.queue.issue_ticket(&clinic_id)?)
    }

    pub fn set_current_number(
        &self,
        clinic_id: String,
        number: u32,
        announce: bool,
    ) -> Result<bool, NidaaError> {
        Ok(self.queue.set_current(&clinic_id, number, announce)?)
    }

    pub fn next_number(&self, clinic_id: String) -> Result<Option<u32>, NidaaError> {
        Ok(self.queue.next(&clinic_id)?)
    }

    pub fn previous_number(&self, clinic_id: String) -> Result<Option<u32>, NidaaError> {
        Ok(self.queue.previous(&clinic_id)?)
    }

    pub fn repeat_number(&self, clinic_id: String) -> Result<Option<u32>, NidaaError> {
        Ok(self.queue.repeat(&clinic_id)?)
    }

    /// Call a number typed by staff; non-numeric input is ignored.
    pub fn call_specific_number(
        &self,
        clinic_id: String,
        input: String,
    ) -> Result<Option<u32>, NidaaError> {
        Ok(self.queue.call_specific(&clinic_id, &input)?)
    }

    pub fn reset_queue(&self, clinic_id: String) -> Result<bool, NidaaError> {
        Ok(self.queue.reset_queue(&clinic_id)?)
    }

    pub fn reset_all_queues(&self) -> Result<(), NidaaError> {
        Ok(self.queue.reset_all_queues()?)
    }

    pub fn trigger_custom_announcement(&self, text: String) -> Result<(), NidaaError> {
        if text.trim().is_empty() {
            return Err(NidaaError::InvalidInput("announcement text is empty".into()));
        }
        Ok(self.queue.trigger_custom_announcement(&text)?)
    }

    pub fn trigger_recording_announcement(&self, audio_blob_url: String) -> Result<(), NidaaError> {
        if audio_blob_url.is_empty() {
            return Err(NidaaError::InvalidInput("recording URL is empty".into()));
        }
        Ok(self.queue.trigger_recording_announcement(&audio_blob_url)?)
    }

    // =========================================================================
    // Admin Operations
    // =========================================================================

    pub fn add_clinic(&self, name: String, password: Option<String>) -> Result<FfiClinic, NidaaError> {
        let clinic = self.queue.add_clinic(&name, password.as_deref())?;
        Ok(PublicClinic::from(&clinic).into())
    }

    pub fn delete_clinic(&self, clinic_id: String) -> Result<bool, NidaaError> {
        Ok(self.queue.delete_clinic(&clinic_id)?)
    }

    /// Rename a clinic and optionally change its password.
    pub fn update_clinic(
        &self,
        clinic_id: String,
        name: String,
        password: Option<String>,
    ) -> Result<(), NidaaError> {
        let mut clinics = self.store().read()?.clinics;
        let clinic = clinics
            .iter_mut()
            .find(|c| c.id == clinic_id)
            .ok_or_else(|| NidaaError::NotFound(clinic_id.clone()))?;
        clinic.name = name;
        if let Some(password) = password {
            clinic.password = password;
        }
        Ok(self.queue.update_clinics_list(clinics)?)
    }

    pub fn update_settings(&self, settings: FfiSettings) -> Result<FfiSettings, NidaaError> {
        if !settings.speech_rate.is_finite() {
            return Err(NidaaError::InvalidInput(format!(
                "speech rate must be finite, got {}",
                settings.speech_rate
            )));
        }
        let patch = SettingsPatch::from(AppSettings::from(settings));
        Ok(self.queue.update_settings(patch)?.into())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn authenticate_admin(&self, password: String) -> Result<FfiAuthOutcome, NidaaError> {
        Ok(self.auth.authenticate_admin(&password)?.into())
    }

    pub fn authenticate_clinic(
        &self,
        clinic_id: String,
        password: String,
    ) -> Result<FfiAuthOutcome, NidaaError> {
        Ok(self.auth.authenticate_clinic(&clinic_id, &password)?.into())
    }

    pub fn check_lockout(&self, context: String) -> Result<FfiLockoutStatus, NidaaError> {
        let status = self.auth.guard().check_status(&context)?;
        Ok(FfiLockoutStatus {
            is_locked: status.is_locked,
            remaining_minutes: status.remaining_minutes,
        })
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    pub fn daily_report(&self) -> Result<Vec<FfiClinicReport>, NidaaError> {
        let report = ReportExporter::new(self.store()).daily_report()?;
        Ok(report.clinics.into_iter().map(|r| r.into()).collect())
    }

    pub fn export_report_json(&self) -> Result<String, NidaaError> {
        let report = ReportExporter::new(self.store()).daily_report()?;
        Ok(report.to_json()?)
    }

    pub fn export_report_csv(&self) -> Result<String, NidaaError> {
        let report = ReportExporter::new(self.store()).daily_report()?;
        Ok(report.to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe public clinic.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiClinic {
    pub id: String,
    pub name: String,
    pub current_number: u32,
    pub tickets_issued: u32,
    pub last_called_at: i64,
    pub waiting: u32,
}

impl From<PublicClinic> for FfiClinic {
    fn from(c: PublicClinic) -> Self {
        Self {
            id: c.id,
            name: c.name,
            current_number: c.current_number,
            tickets_issued: c.tickets_issued,
            last_called_at: c.last_called_at,
            waiting: c.waiting,
        }
    }
}

/// FFI-safe audio mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiAudioMode {
    Tts,
    Files,
}

/// FFI-safe settings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSettings {
    pub center_name: String,
    pub news_ticker: String,
    pub audio_mode: FfiAudioMode,
    pub speech_rate: f64,
    pub admin_password: String,
    pub audio_base_path: String,
    pub video_url: String,
}

impl From<AppSettings> for FfiSettings {
    fn from(s: AppSettings) -> Self {
        Self {
            center_name: s.center_name,
            news_ticker: s.news_ticker,
            audio_mode: match s.audio_mode {
                AudioMode::Tts => FfiAudioMode::Tts,
                AudioMode::Files => FfiAudioMode::Files,
            },
            speech_rate: s.speech_rate,
            admin_password: s.admin_password,
            audio_base_path: s.audio_base_path,
            video_url: s.video_url,
        }
    }
}

impl From<FfiSettings> for AppSettings {
    fn from(s: FfiSettings) -> Self {
        AppSettings {
            center_name: s.center_name,
            news_ticker: s.news_ticker,
            audio_mode: match s.audio_mode {
                FfiAudioMode::Tts => AudioMode::Tts,
                FfiAudioMode::Files => AudioMode::Files,
            },
            speech_rate: s.speech_rate,
            admin_password: s.admin_password,
            audio_base_path: s.audio_base_path,
            video_url: s.video_url,
        }
    }
}

/// FFI-safe announcement, flattened to optional fields.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAnnouncement {
    pub kind: String,
    pub clinic_id: Option<String>,
    pub ticket_number: Option<u32>,
    pub text: Option<String>,
    pub audio_blob_url: Option<String>,
    pub timestamp: i64,
}

impl From<Announcement> for FfiAnnouncement {
    fn from(a: Announcement) -> Self {
        let kind = a.type_name().to_string();
        let mut out = Self {
            kind,
            clinic_id: None,
            ticket_number: None,
            text: None,
            audio_blob_url: None,
            timestamp: a.timestamp,
        };
        match a.kind {
            AnnouncementKind::Ticket {
                clinic_id,
                ticket_number,
            } => {
                out.clinic_id = Some(clinic_id);
                out.ticket_number = Some(ticket_number);
            }
            AnnouncementKind::Custom { text } => out.text = Some(text),
            AnnouncementKind::Recording { audio_blob_url } => {
                out.audio_blob_url = Some(audio_blob_url)
            }
            AnnouncementKind::Reset { clinic_id, text } => {
                out.clinic_id = clinic_id;
                out.text = text;
            }
        }
        out
    }
}

/// FFI-safe login outcome.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum FfiAuthOutcome {
    Granted,
    Denied { remaining_attempts: u32 },
    LockedOut { remaining_minutes: u32 },
    UnknownClinic,
}

impl From<AuthOutcome> for FfiAuthOutcome {
    fn from(o: AuthOutcome) -> Self {
        match o {
            AuthOutcome::Granted => FfiAuthOutcome::Granted,
            AuthOutcome::Denied { remaining_attempts } => {
                FfiAuthOutcome::Denied { remaining_attempts }
            }
            AuthOutcome::LockedOut { remaining_minutes } => {
                FfiAuthOutcome::LockedOut { remaining_minutes }
            }
            AuthOutcome::UnknownClinic => FfiAuthOutcome::UnknownClinic,
        }
    }
}

/// FFI-safe lockout status.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLockoutStatus {
    pub is_locked: bool,
    pub remaining_minutes: u32,
}

/// FFI-safe report row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiClinicReport {
    pub clinic_id: String,
    pub name: String,
    pub issued: u32,
    pub served: u32,
}

impl From<ClinicReport> for FfiClinicReport {
    fn from(r: ClinicReport) -> Self {
        Self {
            clinic_id: r.clinic_id,
            name: r.name,
            issued: r.issued,
            served: r.served,
        }
    }
}
