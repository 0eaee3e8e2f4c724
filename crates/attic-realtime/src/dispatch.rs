//! Envelope fan-out to in-process subscribers.
//!
//! The [`Dispatcher`] is an explicit tag → ordered-callback registry owned by
//! the [`crate::client::RealtimeClient`]. Delivery is synchronous and in
//! registration order; a panicking callback is caught and logged without
//! aborting delivery to the remaining subscribers. Envelopes with no
//! subscribers for their tag are discarded — there is no buffering or replay.
//!
//! The registry lock is held for the duration of a dispatch, which is what
//! makes unsubscription immediate: once [`Subscription::unsubscribe`]
//! returns, the callback will not run again. Callbacks must therefore not
//! call back into the dispatcher.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use attic_core::envelope::Envelope;
use metrics::counter;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

type Callback = Box<dyn Fn(&Value) + Send + Sync>;

struct Entry {
    id: u64,
    callback: Callback,
}

/// Tag → ordered callback registry.
pub struct Dispatcher {
    registry: Mutex<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
    dispatch_count: AtomicU64,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            dispatch_count: AtomicU64::new(0),
        }
    }

    /// Register `callback` under `tag`.
    ///
    /// The returned [`Subscription`] removes exactly this callback when
    /// unsubscribed (explicitly or on drop). Multiple subscriptions to the
    /// same tag are independent and all fire, in registration order.
    pub fn subscribe(
        self: &Arc<Self>,
        tag: impl Into<String>,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        let tag = tag.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut registry = self.registry.lock();
            registry.entry(tag.clone()).or_default().push(Entry {
                id,
                callback: Box::new(callback),
            });
        }
        debug!(%tag, subscription = id, "subscribed");
        Subscription {
            dispatcher: Arc::downgrade(self),
            tag,
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Deliver an envelope to every callback registered under its tag.
    ///
    /// Callbacks run synchronously on the calling thread, in registration
    /// order. A panicking callback is caught and logged; delivery continues.
    pub fn dispatch(&self, envelope: &Envelope) {
        let _ = self.dispatch_count.fetch_add(1, Ordering::Relaxed);
        let registry = self.registry.lock();
        let Some(entries) = registry.get(&envelope.event_type) else {
            counter!(crate::metrics::DISPATCH_DROPPED_TOTAL).increment(1);
            debug!(tag = %envelope.event_type, "no subscribers for tag, envelope dropped");
            return;
        };
        for entry in entries {
            if catch_unwind(AssertUnwindSafe(|| (entry.callback)(&envelope.data))).is_err() {
                counter!(crate::metrics::CALLBACK_PANICS_TOTAL).increment(1);
                warn!(
                    tag = %envelope.event_type,
                    subscription = entry.id,
                    "subscriber panicked during dispatch"
                );
            }
        }
    }

    /// Number of callbacks currently registered under `tag`.
    #[must_use]
    pub fn subscriber_count(&self, tag: &str) -> usize {
        self.registry.lock().get(tag).map_or(0, Vec::len)
    }

    /// Total envelopes dispatched (including those with zero subscribers).
    #[must_use]
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_count.load(Ordering::Relaxed)
    }

    fn remove(&self, tag: &str, id: u64) {
        let mut registry = self.registry.lock();
        if let Some(entries) = registry.get_mut(tag) {
            entries.retain(|e| e.id != id);
            if entries.is_empty() {
                let _ = registry.remove(tag);
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one registered callback.
///
/// Unsubscribing is synchronous, immediate, and idempotent; dropping the
/// handle unsubscribes too.
pub struct Subscription {
    dispatcher: Weak<Dispatcher>,
    tag: String,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the callback from the registry. Calling this more than once
    /// has no additional effect.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.remove(&self.tag, self.id);
            debug!(tag = %self.tag, subscription = self.id, "unsubscribed");
        }
    }

    /// Whether the subscription is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
