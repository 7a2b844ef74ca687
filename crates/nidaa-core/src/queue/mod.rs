//! Queue operations.
//!
//! Every operation is one read-modify-write of the shared document. Calls that
//! announce stamp a new "last announcement"; the display views pick it up
//! through the change bus.

mod admin;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::db::DbResult;
use crate::models::{
    append_capped, Announcement, Document, LogEntry, LogKind, PublicClinic, ALL_QUEUES_RESET_TEXT,
    LOG_CAPACITY, QUEUE_RESET_TEXT,
};
use crate::store::StateStore;

/// Queue operations over an injected store.
pub struct QueueService {
    store: Arc<StateStore>,
    log_capacity: usize,
}

impl QueueService {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self::with_log_capacity(store, LOG_CAPACITY)
    }

    pub fn with_log_capacity(store: Arc<StateStore>, log_capacity: usize) -> Self {
        Self {
            store,
            log_capacity,
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Credential-free clinic list for display and mobile views.
    pub fn public_clinics(&self) -> DbResult<Vec<PublicClinic>> {
        Ok(self.store.read()?.public_clinics())
    }

    /// Print the next ticket for a clinic. Does not announce.
    ///
    /// Returns the new ticket number, or `None` for an unknown clinic.
    pub fn issue_ticket(&self, clinic_id: &str) -> DbResult<Option<u32>> {
        let now = self.store.now_millis();
        let mut doc = self.store.read()?;
        let Some(clinic) = doc.clinic_mut(clinic_id) else {
            return Ok(None);
        };

        let Some(ticket) = clinic.tickets_issued.checked_add(1) else {
            warn!(clinic_id, "ticket counter exhausted");
            return Ok(None);
        };
        clinic.tickets_issued = ticket;
        self.log(&mut doc, LogKind::Issue, clinic_id, ticket, now);
        self.store.write(&doc)?;

        debug!(clinic_id, ticket, "ticket issued");
        Ok(Some(ticket))
    }

    /// Set the serving number. With `announce`, stamps a ticket announcement
    /// and logs the number as served.
    ///
    /// The number is not checked against the issued count.
    pub fn set_current(&self, clinic_id: &str, number: u32, announce: bool) -> DbResult<bool> {
        let mut doc = self.store.read()?;
        let found = self.call_in(&mut doc, clinic_id, |_| Some(number), announce);
        if found.is_none() {
            return Ok(false);
        }
        self.store.write(&doc)?;
        Ok(true)
    }

    /// Call the next number.
    pub fn next(&self, clinic_id: &str) -> DbResult<Option<u32>> {
        self.call(clinic_id, |current| current.checked_add(1))
    }

    /// Step back one number; no-op at zero.
    pub fn previous(&self, clinic_id: &str) -> DbResult<Option<u32>> {
        self.call(clinic_id, |current| current.checked_sub(1))
    }

    /// Announce the current number again.
    pub fn repeat(&self, clinic_id: &str) -> DbResult<Option<u32>> {
        self.call(clinic_id, Some)
    }

    /// Call a number typed by staff. Input that is not a non-negative
    /// integer is ignored.
    pub fn call_specific(&self, clinic_id: &str, input: &str) -> DbResult<Option<u32>> {
        let Ok(number) = input.trim().parse::<u32>() else {
            debug!(clinic_id, input, "ignoring non-numeric call");
            return Ok(None);
        };
        self.call(clinic_id, |_| Some(number))
    }

    fn call(&self, clinic_id: &str, target: impl FnOnce(u32) -> Option<u32>) -> DbResult<Option<u32>> {
        let mut doc = self.store.read()?;
        let called = self.call_in(&mut doc, clinic_id, target, true);
        if called.is_some() {
            self.store.write(&doc)?;
        }
        Ok(called)
    }

    fn call_in(
        &self,
        doc: &mut Document,
        clinic_id: &str,
        target: impl FnOnce(u32) -> Option<u32>,
        announce: bool,
    ) -> Option<u32> {
        let now = self.store.now_millis();
        let stamp = doc.next_announcement_timestamp(now);

        let clinic = doc.clinic_mut(clinic_id)?;
        let number = target(clinic.current_number)?;
        clinic.current_number = number;
        clinic.last_called_at = now;

        if announce {
            doc.last_announcement = Some(Announcement::ticket(clinic_id, number, stamp));
            self.log(doc, LogKind::Serve, clinic_id, number, now);
        }
        debug!(clinic_id, number, announce, "number called");
        Some(number)
    }

    /// Zero one clinic's counters and announce the reset.
    pub fn reset_queue(&self, clinic_id: &str) -> DbResult<bool> {
        let now = self.store.now_millis();
        let mut doc = self.store.read()?;
        let stamp = doc.next_announcement_timestamp(now);
        let Some(clinic) = doc.clinic_mut(clinic_id) else {
            return Ok(false);
        };

        clinic.reset_counters(now);
        doc.last_announcement = Some(Announcement::reset(
            Some(clinic_id.to_string()),
            Some(QUEUE_RESET_TEXT.to_string()),
            stamp,
        ));
        self.store.write(&doc)?;

        info!(clinic_id, "queue reset");
        Ok(true)
    }

    /// Zero every clinic, clear the activity log and announce a global reset.
    pub fn reset_all_queues(&self) -> DbResult<()> {
        let now = self.store.now_millis();
        let mut doc = self.store.read()?;
        let stamp = doc.next_announcement_timestamp(now);

        for clinic in &mut doc.clinics {
            clinic.reset_counters(now);
        }
        doc.logs.clear();
        doc.last_announcement = Some(Announcement::reset(
            None,
            Some(ALL_QUEUES_RESET_TEXT.to_string()),
            stamp,
        ));
        self.store.write(&doc)?;

        info!(clinics = doc.clinics.len(), "all queues reset");
        Ok(())
    }

    /// Broadcast free text to the displays.
    pub fn trigger_custom_announcement(&self, text: &str) -> DbResult<()> {
        let now = self.store.now_millis();
        self.store.update(|doc| {
            let stamp = doc.next_announcement_timestamp(now);
            doc.last_announcement = Some(Announcement::custom(text, stamp));
        })
    }

    /// Broadcast a recorded clip to the displays.
    pub fn trigger_recording_announcement(&self, audio_blob_url: &str) -> DbResult<()> {
        let now = self.store.now_millis();
        self.store.update(|doc| {
            let stamp = doc.next_announcement_timestamp(now);
            doc.last_announcement = Some(Announcement::recording(audio_blob_url, stamp));
        })
    }

    fn log(&self, doc: &mut Document, kind: LogKind, clinic_id: &str, ticket: u32, now: i64) {
        append_capped(
            &mut doc.logs,
            LogEntry::new(kind, clinic_id, ticket, now),
            self.log_capacity,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::db::Database;
    use crate::models::AnnouncementKind;

    fn setup() -> (Arc<ManualClock>, QueueService) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store =
            StateStore::with_clock(Database::open_in_memory().unwrap(), clock.clone()).unwrap();
        (clock, QueueService::new(Arc::new(store)))
    }

    #[test]
    fn test_issue_ticket_does_not_announce() {
        let (_clock, queue) = setup();
        assert_eq!(queue.issue_ticket("c1").unwrap(), Some(1));
        assert_eq!(queue.issue_ticket("c1").unwrap(), Some(2));

        let doc = queue.store().read().unwrap();
        assert_eq!(doc.clinic("c1").unwrap().tickets_issued, 2);
        assert_eq!(doc.clinic("c1").unwrap().current_number, 0);
        assert!(doc.last_announcement.is_none());
        assert_eq!(doc.logs.len(), 2);
        assert!(doc.logs.iter().all(|l| l.kind == LogKind::Issue));
    }

    #[test]
    fn test_issue_at_counter_limit_is_noop() {
        let (_clock, queue) = setup();
        queue
            .store()
            .update(|doc| doc.clinic_mut("c1").unwrap().tickets_issued = u32::MAX)
            .unwrap();

        assert_eq!(queue.issue_ticket("c1").unwrap(), None);
        let doc = queue.store().read().unwrap();
        assert_eq!(doc.clinic("c1").unwrap().tickets_issued, u32::MAX);
        assert!(doc.logs.is_empty());
    }

    #[test]
    fn test_unknown_clinic_is_noop() {
        let (_clock, queue) = setup();
        assert_eq!(queue.issue_ticket("zz").unwrap(), None);
        assert_eq!(queue.next("zz").unwrap(), None);
        assert!(!queue.set_current("zz", 4, true).unwrap());
        assert!(!queue.reset_queue("zz").unwrap());
    }

    #[test]
    fn test_set_current_without_announce() {
        let (clock, queue) = setup();
        assert!(queue.set_current("c2", 8, false).unwrap());

        let doc = queue.store().read().unwrap();
        let clinic = doc.clinic("c2").unwrap();
        assert_eq!(clinic.current_number, 8);
        assert_eq!(clinic.last_called_at, clock.now_millis());
        assert!(doc.last_announcement.is_none());
        assert!(doc.logs.is_empty());
    }

    #[test]
    fn test_previous_guarded_at_zero() {
        let (_clock, queue) = setup();
        assert_eq!(queue.previous("c1").unwrap(), None);
        assert!(queue.store().read().unwrap().last_announcement.is_none());

        queue.next("c1").unwrap();
        assert_eq!(queue.previous("c1").unwrap(), Some(0));
    }

    #[test]
    fn test_repeat_announces_same_number() {
        let (clock, queue) = setup();
        queue.set_current("c3", 6, false).unwrap();
        clock.advance_millis(10);
        assert_eq!(queue.repeat("c3").unwrap(), Some(6));

        let doc = queue.store().read().unwrap();
        let announcement = doc.last_announcement.unwrap();
        assert_eq!(
            announcement.kind,
            AnnouncementKind::Ticket { clinic_id: "c3".into(), ticket_number: 6 }
        );
        assert_eq!(announcement.timestamp, clock.now_millis());
    }

    #[test]
    fn test_call_specific_validates_input() {
        let (_clock, queue) = setup();
        assert_eq!(queue.call_specific("c1", "abc").unwrap(), None);
        assert_eq!(queue.call_specific("c1", "").unwrap(), None);
        assert_eq!(queue.call_specific("c1", "-2").unwrap(), None);
        assert_eq!(queue.store().read().unwrap().clinic("c1").unwrap().current_number, 0);

        // May exceed the issued count
        assert_eq!(queue.call_specific("c1", " 42 ").unwrap(), Some(42));
        let doc = queue.store().read().unwrap();
        assert_eq!(doc.clinic("c1").unwrap().current_number, 42);
        assert_eq!(doc.clinic("c1").unwrap().tickets_issued, 0);
    }

    #[test]
    fn test_same_millisecond_announcements_stay_ordered() {
        let (_clock, queue) = setup();
        queue.next("c1").unwrap();
        let first = queue.store().read().unwrap().last_announcement.unwrap().timestamp;
        queue.next("c1").unwrap();
        let second = queue.store().read().unwrap().last_announcement.unwrap().timestamp;
        assert!(second > first);
    }

    #[test]
    fn test_reset_all_clears_logs() {
        let (_clock, queue) = setup();
        queue.issue_ticket("c1").unwrap();
        queue.issue_ticket("c2").unwrap();
        queue.next("c2").unwrap();

        queue.reset_all_queues().unwrap();
        let doc = queue.store().read().unwrap();
        assert!(doc.logs.is_empty());
        assert!(doc
            .clinics
            .iter()
            .all(|c| c.current_number == 0 && c.tickets_issued == 0));
        let announcement = doc.last_announcement.unwrap();
        assert_eq!(announcement.type_name(), "reset");
        assert_eq!(announcement.clinic_id(), None);
    }

    #[test]
    fn test_custom_and_recording_announcements() {
        let (_clock, queue) = setup();
        queue.trigger_custom_announcement("please wait").unwrap();
        let doc = queue.store().read().unwrap();
        assert_eq!(
            doc.last_announcement.as_ref().unwrap().kind,
            AnnouncementKind::Custom { text: "please wait".into() }
        );

        queue.trigger_recording_announcement("blob:clip-1").unwrap();
        let doc = queue.store().read().unwrap();
        assert_eq!(doc.last_announcement.unwrap().type_name(), "recording");
    }

    #[test]
    fn test_log_capacity_is_configurable() {
        let store = Arc::new(StateStore::open_in_memory().unwrap());
        let queue = QueueService::with_log_capacity(store, 3);
        for _ in 0..5 {
            queue.issue_ticket("c1").unwrap();
        }
        let logs = queue.store().read().unwrap().logs;
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].ticket_number, 3);
    }
}
