//! Change notification bus.
//!
//! A payload-free "something changed" wakeup. Every completed store write
//! notifies all subscribers synchronously, including those living in the
//! writer's own view. Subscribers re-read the document themselves.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<u64, Handler>>,
}

/// Cloneable handle to a shared subscriber registry.
#[derive(Clone, Default)]
pub struct ChangeBus {
    inner: Arc<Registry>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It stays registered until the returned
    /// [`Subscription`] is dropped or explicitly unsubscribed.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        match self.inner.handlers.lock() {
            Ok(mut handlers) => {
                handlers.insert(id, Arc::new(handler));
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(id, Arc::new(handler));
            }
        }
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Wake every subscriber in registration order.
    ///
    /// Handlers run outside the registry lock, so they may subscribe or
    /// unsubscribe while being notified.
    pub fn notify(&self) {
        let handlers: Vec<Handler> = match self.inner.handlers.lock() {
            Ok(handlers) => handlers.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        };
        tracing::trace!(subscribers = handlers.len(), "change notification");
        for handler in handlers {
            handler();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        match self.inner.handlers.lock() {
            Ok(handlers) => handlers.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by [`ChangeBus::subscribe`]. Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            match registry.handlers.lock() {
                Ok(mut handlers) => {
                    handlers.remove(&self.id);
                }
                Err(poisoned) => {
                    poisoned.into_inner().remove(&self.id);
                }
            }
        }
    }
}
