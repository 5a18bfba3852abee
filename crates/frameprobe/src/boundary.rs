//! Isolation Boundary
//!
//! In-process stand-in for the cross-document message channel. Documents on
//! either side never call each other; they post [`RawMessage`]s and every live
//! listener receives them. Delivery is synchronous: when `post` returns, every
//! listener registered before the call has seen the message.

use crate::message::RawMessage;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Listener = Arc<dyn Fn(&RawMessage) + Send + Sync>;

#[derive(Default)]
struct BoundaryInner {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    posted: AtomicU64,
}

/// Shared handle to a message channel between documents
#[derive(Clone, Default)]
pub struct MessageBoundary {
    inner: Arc<BoundaryInner>,
}

impl std::fmt::Debug for MessageBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBoundary")
            .field("listeners", &self.listener_count())
            .field("posted", &self.posted_count())
            .finish()
    }
}

impl MessageBoundary {
    /// Create an empty boundary
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it stays installed until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription removes the listener immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RawMessage) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }
        Subscription {
            id,
            boundary: Arc::downgrade(&self.inner),
        }
    }

    /// Post `data` as if sent by a document served from `origin`.
    ///
    /// Returns the number of listeners the message was delivered to.
    pub fn post(&self, origin: impl Into<String>, data: Value) -> usize {
        self.post_raw(&RawMessage::new(origin, data))
    }

    /// Deliver an already-built raw message
    pub fn post_raw(&self, message: &RawMessage) -> usize {
        self.inner.posted.fetch_add(1, Ordering::SeqCst);
        // Listeners run outside the lock so they may subscribe or unsubscribe.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .map(|l| l.iter().map(|(_, f)| Arc::clone(f)).collect())
            .unwrap_or_default();
        tracing::trace!(
            origin = %message.origin,
            listeners = listeners.len(),
            "boundary post"
        );
        for listener in &listeners {
            listener(message);
        }
        listeners.len()
    }

    /// Number of installed listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Number of messages posted so far, whatever their origin
    #[must_use]
    pub fn posted_count(&self) -> u64 {
        self.inner.posted.load(Ordering::SeqCst)
    }
}

/// Guard keeping a boundary listener installed
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    boundary: Weak<BoundaryInner>,
}

impl Subscription {
    /// Whether the boundary this subscription belongs to still exists
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.boundary.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.boundary.upgrade() {
            if let Ok(mut listeners) = inner.listeners.lock() {
                listeners.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
