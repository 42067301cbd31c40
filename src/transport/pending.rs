//! Pending handshake registry.
//!
//! Uses a sharded concurrent map so that response dispatch, timeouts, and
//! close listeners on different threads can insert and remove entries
//! without a global lock. Removal returns the previous entry atomically;
//! that removal is what elects the winner when several terminal events race
//! for the same handshake.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use super::handshaker::HandshakeResponseHandler;

/// Concurrent map from request id to the in-flight handshake handler.
///
/// Cheap to clone; clones share the same underlying map.
#[derive(Clone, Default)]
pub struct PendingTable {
    inner: Arc<DashMap<u64, Arc<HandshakeResponseHandler>>>,
}

impl PendingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `request_id`.
    ///
    /// Request ids are caller-chosen and must be fresh; re-inserting over a
    /// live id is not checked.
    pub fn insert(&self, request_id: u64, handler: Arc<HandshakeResponseHandler>) {
        self.inner.insert(request_id, handler);
    }

    /// Remove and return the handler for `request_id`, if still pending.
    ///
    /// At most one caller observes `Some` for a given insertion.
    pub fn remove(&self, request_id: u64) -> Option<Arc<HandshakeResponseHandler>> {
        self.inner.remove(&request_id).map(|(_, handler)| handler)
    }

    /// Number of handshakes still awaiting a terminal event.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if no handshake is in flight.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for PendingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTable")
            .field("pending", &self.len())
            .finish()
    }
}
