//! # Message Router
//!
//! Process-wide dispatch registry decoupling bus message arrival from
//! consumers awaiting a specific channel.
//!
//! Registrations are keyed by (channel, message kind). Every in-flight
//! transaction owns a unique channel, so concurrent register/unregister calls
//! operate on distinct keys and never interfere.

use crate::message::{MessageKind, WireMessage};
use dashmap::DashMap;
use farm_types::Channel;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// A registered message handler.
///
/// Handlers must be cheap and non-blocking; they run on the inbound pump
/// task. Long work belongs behind a channel.
pub type HandlerFn = Arc<dyn Fn(&Channel, &WireMessage) + Send + Sync>;

/// Opaque registration handle returned by [`MessageRouter::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Channel-keyed dispatch registry.
///
/// Supports many concurrently registered handlers (one per in-flight
/// transaction). Mutation is registry-only; the router performs no I/O.
pub struct MessageRouter {
    /// Handlers by (channel, kind).
    handlers: DashMap<(Channel, MessageKind), Vec<(HandlerId, HandlerFn)>>,
    /// Secondary index so unregister never scans the registry.
    index: DashMap<HandlerId, (Channel, MessageKind)>,
    /// Next registration id.
    next_id: AtomicU64,
}

impl MessageRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            index: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `handler` for messages of `kind` arriving on `channel`.
    pub fn register(&self, channel: Channel, kind: MessageKind, handler: HandlerFn) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let key = (channel, kind);

        self.index.insert(id, key.clone());
        self.handlers
            .entry(key.clone())
            .or_default()
            .push((id, handler));

        debug!(channel = %key.0, kind = ?kind, id = id.0, "Registered handler");
        id
    }

    /// Remove a registration. Idempotent: removing an already-removed handler
    /// is a no-op.
    pub fn unregister(&self, id: HandlerId) {
        let Some((_, key)) = self.index.remove(&id) else {
            trace!(id = id.0, "Unregister for unknown handler (no-op)");
            return;
        };

        if let Some(mut entry) = self.handlers.get_mut(&key) {
            entry.retain(|(handler_id, _)| *handler_id != id);
        }
        // Drop empty buckets so the registry does not grow over the life of
        // the process.
        self.handlers
            .remove_if(&key, |_, handlers| handlers.is_empty());

        debug!(channel = %key.0, id = id.0, "Unregistered handler");
    }

    /// Deliver `message` to every handler registered for its kind on
    /// `channel`. Returns the number of handlers invoked; zero means the
    /// message was dropped, which is not an error.
    pub fn dispatch(&self, channel: &Channel, message: &WireMessage) -> usize {
        let key = (channel.clone(), message.kind());

        // Snapshot the handlers before invoking so a handler that mutates the
        // registry cannot deadlock against the shard lock.
        let snapshot: Vec<HandlerFn> = match self.handlers.get(&key) {
            Some(entry) => entry.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => Vec::new(),
        };

        if snapshot.is_empty() {
            trace!(channel = %channel, kind = ?message.kind(), "No handler, message dropped");
            return 0;
        }

        for handler in &snapshot {
            handler(channel, message);
        }
        snapshot.len()
    }

    /// Number of live registrations.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.index.len()
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}
