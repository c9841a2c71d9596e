//! Shared application state.
//!
//! The setlist is the one process-wide mutable value. It lives in a
//! single-writer cell that is only ever replaced wholesale (merge result or
//! client-supplied reorder), so the tick pump's snapshot is always either
//! the old or the new value, never a torn mix of both.

use std::sync::Arc;

use parking_lot::RwLock;

use liveset_core::Setlist;

use crate::relay::Relay;
use crate::transport::TransportLink;

/// Atomically swappable handle to the current setlist.
#[derive(Clone, Default)]
pub struct SetlistCell {
    inner: Arc<RwLock<Arc<Setlist>>>,
}

impl SetlistCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current setlist. The lock is held only long enough
    /// to clone the `Arc`; the caller reads a consistent value for as long
    /// as it keeps the handle.
    pub fn load(&self) -> Arc<Setlist> {
        Arc::clone(&self.inner.read())
    }

    /// Replace the whole setlist. In-flight readers keep their snapshot.
    pub fn replace(&self, setlist: Setlist) {
        *self.inner.write() = Arc::new(setlist);
    }
}

/// Everything the route handlers and the tick pump share.
pub struct AppState<L> {
    pub transport: Arc<L>,
    pub setlist: SetlistCell,
    pub relay: Relay,
}

impl<L> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            setlist: self.setlist.clone(),
            relay: self.relay.clone(),
        }
    }
}

impl<L: TransportLink> AppState<L> {
    pub fn new(transport: L) -> Self {
        Self {
            transport: Arc::new(transport),
            setlist: SetlistCell::new(),
            relay: Relay::new(),
        }
    }
}
