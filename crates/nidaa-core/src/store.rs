//! The shared state store.
//!
//! All views read and write the [`Document`] through this store. Writes are
//! whole-document and last-write-wins; there is no compare-and-swap. Callers
//! must `read()` immediately before mutating and never cache the document
//! beyond a single operation.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::bus::{ChangeBus, Subscription};
use crate::clock::{Clock, SystemClock};
use crate::db::{Database, DbResult};
use crate::models::{migrate_legacy, Document};

/// Key of the shared document in the key-value table.
pub const DOCUMENT_KEY: &str = "nidaa_qms_db";

/// Injected store service shared by every view in the process.
pub struct StateStore {
    db: Mutex<Database>,
    bus: ChangeBus,
    clock: Arc<dyn Clock>,
    seen_version: Mutex<Option<i64>>,
}

impl StateStore {
    /// Wrap a database, seeding or migrating the document if needed.
    pub fn new(db: Database) -> DbResult<Self> {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> DbResult<Self> {
        let store = Self {
            db: Mutex::new(db),
            bus: ChangeBus::new(),
            clock,
            seen_version: Mutex::new(None),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open a file-backed store.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> DbResult<Self> {
        Self::new(Database::open(path)?)
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        Self::new(Database::open_in_memory()?)
    }

    fn initialize(&self) -> DbResult<()> {
        let db = self.lock()?;
        match db.get_value(DOCUMENT_KEY)? {
            None => {
                info!("no stored document, seeding defaults");
                db.put_json(DOCUMENT_KEY, &Document::default())?;
            }
            Some(raw) => {
                let Ok(mut value) = serde_json::from_str::<serde_json::Value>(&raw) else {
                    warn!("stored document is not valid JSON, leaving it for the next write");
                    return Ok(());
                };
                if migrate_legacy(&mut value) {
                    info!("migrated legacy document without activity log");
                    db.put_value(DOCUMENT_KEY, &value.to_string())?;
                }
            }
        }
        let version = db.data_version()?;
        drop(db);
        *self.seen_version.lock()? = Some(version);
        Ok(())
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Database>> {
        Ok(self.db.lock()?)
    }

    /// Fresh copy of the document.
    ///
    /// Absent documents are materialized from defaults; corrupt ones fail
    /// closed to defaults without overwriting what is stored.
    pub fn read(&self) -> DbResult<Document> {
        let db = self.lock()?;
        let raw = db.get_value(DOCUMENT_KEY)?;
        drop(db);
        let Some(raw) = raw else {
            let doc = Document::default();
            self.write(&doc)?;
            return Ok(doc);
        };

        let mut value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "corrupt document, falling back to defaults");
                return Ok(Document::default());
            }
        };
        migrate_legacy(&mut value);
        match serde_json::from_value(value) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(error = %e, "document does not match schema, falling back to defaults");
                Ok(Document::default())
            }
        }
    }

    /// Persist the whole document, then wake every subscriber.
    pub fn write(&self, doc: &Document) -> DbResult<()> {
        {
            let db = self.lock()?;
            db.put_json(DOCUMENT_KEY, doc)?;
            let version = db.data_version()?;
            *self.seen_version.lock()? = Some(version);
        }
        debug!(
            clinics = doc.clinics.len(),
            logs = doc.logs.len(),
            "document written"
        );
        self.bus.notify();
        Ok(())
    }

    /// Read, mutate and write back in one step.
    ///
    /// This is still last-write-wins against other connections; it only saves
    /// callers from holding a document across operations.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut Document) -> T) -> DbResult<T> {
        let mut doc = self.read()?;
        let out = mutate(&mut doc);
        self.write(&doc)?;
        Ok(out)
    }

    /// Notify subscribers if another connection committed since we last looked.
    ///
    /// Returns `true` when a foreign write was detected.
    pub fn refresh(&self) -> DbResult<bool> {
        let version = self.lock()?.data_version()?;
        let changed = {
            let mut seen = self.seen_version.lock()?;
            let changed = seen.is_some_and(|v| v != version);
            *seen = Some(version);
            changed
        };
        if changed {
            debug!("external write detected");
            self.bus.notify();
        }
        Ok(changed)
    }

    /// Subscribe to change notifications.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.bus.subscribe(handler)
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Run a closure with the underlying database (lockout records live there too).
    pub fn with_db<T>(&self, f: impl FnOnce(&Database) -> DbResult<T>) -> DbResult<T> {
        let db = self.lock()?;
        f(&db)
    }
}
