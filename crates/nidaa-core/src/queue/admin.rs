//! Structural edits from the admin panel. None of these announce.

use tracing::info;

use super::QueueService;
use crate::db::DbResult;
use crate::models::{AppSettings, Clinic, SettingsPatch, DEFAULT_CLINIC_PASSWORD};

impl QueueService {
    pub fn settings(&self) -> DbResult<AppSettings> {
        Ok(self.store.read()?.settings)
    }

    /// Merge a partial settings update.
    pub fn update_settings(&self, patch: SettingsPatch) -> DbResult<AppSettings> {
        self.store.update(|doc| {
            patch.apply(&mut doc.settings);
            doc.settings.clone()
        })
    }

    /// Replace the whole clinic list.
    pub fn update_clinics_list(&self, clinics: Vec<Clinic>) -> DbResult<()> {
        info!(clinics = clinics.len(), "clinic list replaced");
        self.store.update(|doc| doc.clinics = clinics)
    }

    /// Remove a clinic. Its log entries stay but drop out of reports.
    pub fn delete_clinic(&self, clinic_id: &str) -> DbResult<bool> {
        let removed = self.store.update(|doc| {
            let before = doc.clinics.len();
            doc.clinics.retain(|c| c.id != clinic_id);
            doc.clinics.len() != before
        })?;
        if removed {
            info!(clinic_id, "clinic deleted");
        }
        Ok(removed)
    }

    /// Add a clinic with zeroed counters. The password defaults to the
    /// standard clinic password when `None`.
    pub fn add_clinic(&self, name: &str, password: Option<&str>) -> DbResult<Clinic> {
        let now = self.store.now_millis();
        let clinic = self.store.update(|doc| {
            let mut id = format!("c{}", now);
            let mut suffix = 1;
            while doc.clinic(&id).is_some() {
                id = format!("c{}_{}", now, suffix);
                suffix += 1;
            }
            let clinic = Clinic::new(id, name, password.unwrap_or(DEFAULT_CLINIC_PASSWORD));
            doc.clinics.push(clinic.clone());
            clinic
        })?;
        info!(clinic_id = %clinic.id, "clinic added");
        Ok(clinic)
    }
}
