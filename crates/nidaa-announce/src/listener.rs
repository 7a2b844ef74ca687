//! Display-side reaction to store changes.
//!
//! On every change signal the listener re-reads the document, replays the
//! last announcement if this view has not processed it yet, and publishes
//! banner events for the screen.

use std::sync::{Arc, Mutex, Weak};

use nidaa_core::models::{Announcement, Document};
use nidaa_core::{StateStore, Subscription};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::display::DisplayCue;
use crate::pipeline::AnnouncementPipeline;

const DISPLAY_EVENT_CAPACITY: usize = 64;

/// Highest announcement timestamp a view has processed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnnouncementTracker {
    last_processed: i64,
}

impl AnnouncementTracker {
    /// A fresh view: the stored announcement, if any, will be replayed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A view that treats everything already in `doc` as processed.
    pub fn primed(doc: &Document) -> Self {
        Self {
            last_processed: doc.last_announcement.as_ref().map_or(0, |a| a.timestamp),
        }
    }

    pub fn last_processed(&self) -> i64 {
        self.last_processed
    }

    /// Take the document's announcement if it is strictly newer than anything
    /// processed so far.
    pub fn accept<'a>(&mut self, doc: &'a Document) -> Option<&'a Announcement> {
        let announcement = doc.last_announcement.as_ref()?;
        if announcement.timestamp <= self.last_processed {
            return None;
        }
        self.last_processed = announcement.timestamp;
        Some(announcement)
    }
}

/// Banner changes for the display screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Show { timestamp: i64, cue: DisplayCue },
    /// Cue duration elapsed for the announcement with this timestamp
    Clear { timestamp: i64 },
}

/// Keeps a display view in sync with the store while alive.
pub struct AnnouncementListener {
    events: broadcast::Sender<DisplayEvent>,
    tracker: Arc<Mutex<AnnouncementTracker>>,
    _subscription: Subscription,
}

impl AnnouncementListener {
    /// Subscribe to `store` and process the currently stored announcement.
    ///
    /// Playback and banner timers run on `handle`.
    pub fn attach(
        store: &Arc<StateStore>,
        pipeline: Arc<AnnouncementPipeline>,
        handle: Handle,
    ) -> Self {
        Self::attach_with(store, pipeline, handle, AnnouncementTracker::new())
    }

    pub fn attach_with(
        store: &Arc<StateStore>,
        pipeline: Arc<AnnouncementPipeline>,
        handle: Handle,
        tracker: AnnouncementTracker,
    ) -> Self {
        let (events, _) = broadcast::channel(DISPLAY_EVENT_CAPACITY);
        let tracker = Arc::new(Mutex::new(tracker));

        let sync = {
            let store = Arc::downgrade(store);
            let tracker = tracker.clone();
            let events = events.clone();
            Arc::new(move || sync_view(&store, &tracker, &pipeline, &handle, &events))
        };
        // Subscribe before the first sync so a write landing in between still wakes us
        let subscription = {
            let sync = sync.clone();
            store.subscribe(move || sync())
        };
        sync();

        Self {
            events,
            tracker,
            _subscription: subscription,
        }
    }

    /// Receive banner events from now on.
    pub fn events(&self) -> broadcast::Receiver<DisplayEvent> {
        self.events.subscribe()
    }

    pub fn last_processed(&self) -> i64 {
        match self.tracker.lock() {
            Ok(tracker) => tracker.last_processed(),
            Err(poisoned) => poisoned.into_inner().last_processed(),
        }
    }
}

fn sync_view(
    store: &Weak<StateStore>,
    tracker: &Mutex<AnnouncementTracker>,
    pipeline: &Arc<AnnouncementPipeline>,
    handle: &Handle,
    events: &broadcast::Sender<DisplayEvent>,
) {
    let Some(store) = store.upgrade() else {
        return;
    };
    let doc = match store.read() {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "display could not read the store");
            return;
        }
    };

    let announcement = {
        let Ok(mut tracker) = tracker.lock() else {
            warn!("announcement tracker poisoned");
            return;
        };
        tracker.accept(&doc).cloned()
    };
    let Some(announcement) = announcement else {
        return;
    };

    let timestamp = announcement.timestamp;
    let Some(cue) = DisplayCue::for_announcement(&announcement, &doc.clinics) else {
        debug!(timestamp, kind = announcement.type_name(), "empty announcement skipped");
        return;
    };
    debug!(timestamp, kind = announcement.type_name(), "announcing");

    let duration = cue.duration;
    let _ = events.send(DisplayEvent::Show { timestamp, cue });
    pipeline.spawn(handle, announcement, doc);

    let events = events.clone();
    handle.spawn(async move {
        tokio::time::sleep(duration).await;
        let _ = events.send(DisplayEvent::Clear { timestamp });
    });
}
