//! End-to-end queue scenarios against a real store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nidaa_core::db::Database;
use nidaa_core::lockout::{LockoutGuard, ADMIN_PANEL, CONTROL_PANEL};
use nidaa_core::models::{
    Announcement, AnnouncementKind, AppSettings, AudioMode, Clinic, Document, LogEntry, LogKind,
    SettingsPatch,
};
use nidaa_core::store::DOCUMENT_KEY;
use nidaa_core::{Authenticator, AuthOutcome, ManualClock, QueueService, StateStore};
use proptest::prelude::*;

const START: i64 = 1_700_000_000_000;

fn setup() -> (Arc<ManualClock>, QueueService) {
    let clock = Arc::new(ManualClock::new(START));
    let store =
        StateStore::with_clock(Database::open_in_memory().unwrap(), clock.clone()).unwrap();
    (clock, QueueService::new(Arc::new(store)))
}

#[test]
fn test_advance_calls_next_and_logs_serve() {
    let (clock, queue) = setup();
    queue
        .store()
        .update(|doc| {
            let clinic = doc.clinic_mut("c1").unwrap();
            clinic.tickets_issued = 5;
            clinic.current_number = 2;
        })
        .unwrap();
    clock.advance_millis(250);

    assert_eq!(queue.next("c1").unwrap(), Some(3));

    let doc = queue.store().read().unwrap();
    let clinic = doc.clinic("c1").unwrap();
    assert_eq!(clinic.current_number, 3);
    assert_eq!(clinic.tickets_issued, 5);
    assert_eq!(clinic.waiting(), 2);
    assert_eq!(clinic.last_called_at, START + 250);

    let serves: Vec<_> = doc.logs.iter().filter(|l| l.kind == LogKind::Serve).collect();
    assert_eq!(serves.len(), 1);
    assert_eq!(serves[0].ticket_number, 3);

    let announcement = doc.last_announcement.unwrap();
    assert_eq!(
        announcement.kind,
        AnnouncementKind::Ticket {
            clinic_id: "c1".into(),
            ticket_number: 3
        }
    );
}

#[test]
fn test_kiosk_issue_leaves_display_alone() {
    let (_clock, queue) = setup();
    for expected in 1..=3 {
        assert_eq!(queue.issue_ticket("c4").unwrap(), Some(expected));
    }

    let clinics = queue.public_clinics().unwrap();
    let c4 = clinics.iter().find(|c| c.id == "c4").unwrap();
    assert_eq!(c4.tickets_issued, 3);
    assert_eq!(c4.current_number, 0);
    assert_eq!(c4.waiting, 3);
    assert!(queue.store().read().unwrap().last_announcement.is_none());
}

#[test]
fn test_reset_is_idempotent() {
    let (clock, queue) = setup();
    queue.issue_ticket("c2").unwrap();
    queue.next("c2").unwrap();

    assert!(queue.reset_queue("c2").unwrap());
    let first = queue.store().read().unwrap();
    clock.advance_millis(5);
    assert!(queue.reset_queue("c2").unwrap());
    let second = queue.store().read().unwrap();

    let counters = |doc: &nidaa_core::Document| {
        doc.clinics
            .iter()
            .map(|c| (c.id.clone(), c.current_number, c.tickets_issued))
            .collect::<Vec<_>>()
    };
    assert_eq!(counters(&first), counters(&second));
    let c2 = second.clinic("c2").unwrap();
    assert_eq!((c2.current_number, c2.tickets_issued), (0, 0));

    let announcement = second.last_announcement.unwrap();
    assert_eq!(announcement.type_name(), "reset");
    assert_eq!(announcement.clinic_id(), Some("c2"));
    assert!(announcement.timestamp > first.last_announcement.unwrap().timestamp);
}

#[test]
fn test_log_keeps_newest_thousand() {
    let (_clock, queue) = setup();
    for _ in 0..1050 {
        queue.issue_ticket("c1").unwrap();
    }

    let logs = queue.store().read().unwrap().logs;
    assert_eq!(logs.len(), 1000);
    assert_eq!(logs.first().unwrap().ticket_number, 51);
    assert_eq!(logs.last().unwrap().ticket_number, 1050);
}

#[test]
fn test_every_write_wakes_subscribers() {
    let (_clock, queue) = setup();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let _sub = queue.store().subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    queue.issue_ticket("c1").unwrap();
    queue.next("c1").unwrap();
    queue.trigger_custom_announcement("hello").unwrap();
    // Unknown clinic writes nothing
    queue.next("nope").unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn test_control_panel_lockout_cycle() {
    let clock = Arc::new(ManualClock::new(START));
    let store = Arc::new(
        StateStore::with_clock(Database::open_in_memory().unwrap(), clock.clone()).unwrap(),
    );
    let auth = Authenticator::new(store.clone(), LockoutGuard::new(store.clone()));

    assert_eq!(
        auth.authenticate_clinic("c1", "bad").unwrap(),
        AuthOutcome::Denied {
            remaining_attempts: 2
        }
    );
    auth.authenticate_clinic("c1", "bad").unwrap();
    assert_eq!(
        auth.authenticate_clinic("c1", "bad").unwrap(),
        AuthOutcome::LockedOut {
            remaining_minutes: 15
        }
    );

    // Correct password is refused while locked
    clock.advance_minutes(14);
    clock.advance_millis(30_000);
    assert_eq!(
        auth.authenticate_clinic("c1", "123").unwrap(),
        AuthOutcome::LockedOut {
            remaining_minutes: 1
        }
    );

    // Admin context is unaffected
    assert!(!auth.guard().check_status(ADMIN_PANEL).unwrap().is_locked);

    clock.advance_minutes(1);
    assert_eq!(
        auth.authenticate_clinic("c1", "123").unwrap(),
        AuthOutcome::Granted
    );
    assert_eq!(auth.guard().state(CONTROL_PANEL).unwrap().attempts, 0);
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.db");

    {
        let queue = QueueService::new(Arc::new(StateStore::open(&path).unwrap()));
        queue.issue_ticket("c3").unwrap();
        queue.next("c3").unwrap();
        queue.add_clinic("Radiology", None).unwrap();
    }

    let store = StateStore::open(&path).unwrap();
    let doc = store.read().unwrap();
    assert_eq!(doc.clinics.len(), 5);
    assert_eq!(doc.clinic("c3").unwrap().current_number, 1);
    assert_eq!(doc.logs.len(), 2);
    assert!(doc.last_announcement.is_some());
}

#[test]
fn test_legacy_document_is_upgraded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");

    {
        let db = Database::open(&path).unwrap();
        let legacy = serde_json::json!({
            "clinics": [
                { "id": "c1", "name": "Old", "password": "1", "currentNumber": 7 }
            ],
            "settings": {
                "centerName": "Legacy Center",
                "newsTicker": "",
                "audioMode": "TTS",
                "speechRate": 0.9,
                "adminPassword": "admin",
                "audioBasePath": "/audio/",
                "videoUrl": ""
            },
            "lastAnnouncement": null
        });
        db.put_value(DOCUMENT_KEY, &legacy.to_string()).unwrap();
    }

    let queue = QueueService::new(Arc::new(StateStore::open(&path).unwrap()));
    let doc = queue.store().read().unwrap();
    let clinic = doc.clinic("c1").unwrap();
    assert_eq!(clinic.tickets_issued, 7);
    assert_eq!(clinic.waiting(), 0);
    assert!(doc.logs.is_empty());

    assert_eq!(queue.issue_ticket("c1").unwrap(), Some(8));
}

#[test]
fn test_replacing_clinics_keeps_announcement() {
    let (_clock, queue) = setup();
    queue.next("c1").unwrap();
    queue
        .update_clinics_list(vec![Clinic::new("c9", "Eye Clinic", "pw")])
        .unwrap();

    let doc = queue.store().read().unwrap();
    assert_eq!(doc.clinics.len(), 1);
    assert_eq!(doc.last_announcement.unwrap().clinic_id(), Some("c1"));
}

fn arb_clinic() -> impl Strategy<Value = Clinic> {
    ("[a-z0-9]{1,8}", "\\PC{0,16}", "[0-9]{0,6}", any::<u32>(), any::<u32>(), any::<i64>()).prop_map(
        |(id, name, password, current_number, tickets_issued, last_called_at)| Clinic {
            id,
            name,
            password,
            current_number,
            tickets_issued,
            last_called_at,
        },
    )
}

fn arb_log() -> impl Strategy<Value = LogEntry> {
    (
        "[a-f0-9-]{1,36}",
        prop_oneof![Just(LogKind::Issue), Just(LogKind::Serve)],
        "[a-z0-9]{1,8}",
        any::<u32>(),
        any::<i64>(),
    )
        .prop_map(|(id, kind, clinic_id, ticket_number, timestamp)| LogEntry {
            id,
            kind,
            clinic_id,
            ticket_number,
            timestamp,
        })
}

fn arb_announcement() -> impl Strategy<Value = Announcement> {
    let kind = prop_oneof![
        ("[a-z0-9]{1,8}", any::<u32>()).prop_map(|(c, n)| Announcement::ticket(c, n, 0)),
        "\\PC{0,24}".prop_map(|t| Announcement::custom(t, 0)),
        "blob:[a-z0-9/-]{0,24}".prop_map(|u| Announcement::recording(u, 0)),
        (
            proptest::option::of("[a-z0-9]{1,8}"),
            proptest::option::of("\\PC{0,24}")
        )
            .prop_map(|(c, t)| Announcement::reset(c, t, 0)),
    ];
    (kind, any::<i64>()).prop_map(|(mut a, ts)| {
        a.timestamp = ts;
        a
    })
}

fn arb_settings() -> impl Strategy<Value = AppSettings> {
    (
        "\\PC{0,24}",
        "\\PC{0,48}",
        prop_oneof![Just(AudioMode::Tts), Just(AudioMode::Files)],
        // Tenths keep the rate inside the valid range and exact through JSON
        (5u32..=20).prop_map(|n| n as f64 / 10.0),
        "[a-z0-9]{0,12}",
        "[a-z./]{0,16}",
        "[a-z:/.]{0,24}",
    )
        .prop_map(
            |(center_name, news_ticker, audio_mode, speech_rate, admin_password, audio_base_path, video_url)| {
                AppSettings {
                    center_name,
                    news_ticker,
                    audio_mode,
                    speech_rate,
                    admin_password,
                    audio_base_path,
                    video_url,
                }
            },
        )
}

fn arb_document() -> impl Strategy<Value = Document> {
    (
        proptest::collection::vec(arb_clinic(), 0..6),
        arb_settings(),
        proptest::option::of(arb_announcement()),
        proptest::collection::vec(arb_log(), 0..8),
    )
        .prop_map(|(clinics, settings, last_announcement, logs)| Document {
            clinics,
            settings,
            last_announcement,
            logs,
        })
}

fn arb_rate() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        any::<f64>(),
    ]
}

proptest! {
    #[test]
    fn prop_document_survives_store(doc in arb_document()) {
        let store = StateStore::open_in_memory().unwrap();
        store.write(&doc).unwrap();
        prop_assert_eq!(store.read().unwrap(), doc);
    }

    #[test]
    fn prop_any_speech_rate_keeps_counters(rate in arb_rate()) {
        let (_clock, queue) = setup();
        queue.issue_ticket("c1").unwrap();
        queue.next("c1").unwrap();

        let settings = queue
            .update_settings(SettingsPatch { speech_rate: Some(rate), ..Default::default() })
            .unwrap();
        prop_assert!(settings.speech_rate.is_finite());
        let valid = AppSettings::MIN_SPEECH_RATE..=AppSettings::MAX_SPEECH_RATE;
        prop_assert!(valid.contains(&settings.speech_rate));

        let doc = queue.store().read().unwrap();
        prop_assert_eq!(&doc.settings, &settings);
        let clinic = doc.clinic("c1").unwrap();
        prop_assert_eq!(clinic.tickets_issued, 1);
        prop_assert_eq!(clinic.current_number, 1);
        prop_assert_eq!(doc.logs.len(), 2);
    }

    #[test]
    fn prop_waiting_never_negative(issued in 0u32..500, called in 0u32..1000) {
        let mut clinic = Clinic::new("p1", "Prop", "pw");
        clinic.tickets_issued = issued;
        clinic.current_number = called;
        prop_assert_eq!(clinic.waiting(), issued.saturating_sub(called));
    }

    #[test]
    fn prop_call_specific_accepts_any_u32(n in any::<u32>()) {
        let (_clock, queue) = setup();
        prop_assert_eq!(queue.call_specific("c2", &n.to_string()).unwrap(), Some(n));
        let doc = queue.store().read().unwrap();
        prop_assert_eq!(doc.clinic("c2").unwrap().current_number, n);
    }
}
