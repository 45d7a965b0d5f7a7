//! # Bus Transport
//!
//! The publish/subscribe boundary to the wire. The in-memory implementation
//! here uses `tokio::sync::broadcast` and is suitable for single-node
//! operation and tests; farm deployments substitute a socket-backed transport
//! behind the same trait.

use crate::message::WireMessage;
use crate::router::MessageRouter;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use farm_types::Channel;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Errors from transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The transport was shut down.
    #[error("bus closed")]
    Closed,
}

/// Publish/subscribe access to the wire.
///
/// `subscribe`/`unsubscribe` gate which channels the inbound side delivers to
/// the [`MessageRouter`]; they are registry operations, not I/O, and so are
/// synchronous.
#[async_trait]
pub trait BusTransport: Send + Sync {
    /// Publish a message to its destination channel.
    ///
    /// Returns the number of receivers the transport delivered to.
    async fn publish(&self, message: WireMessage) -> Result<usize, BusError>;

    /// Start delivering inbound messages on `channel` to the router.
    fn subscribe(&self, channel: &Channel);

    /// Stop delivering inbound messages on `channel`. Idempotent.
    fn unsubscribe(&self, channel: &Channel);
}

/// In-memory transport over `tokio::sync::broadcast`.
pub struct InMemoryBus {
    /// Broadcast sender for all wire traffic.
    sender: broadcast::Sender<WireMessage>,

    /// Channels the inbound pump delivers to the router.
    subscriptions: Arc<RwLock<HashSet<Channel>>>,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashSet::new())),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Open a channel-filtered receive handle.
    ///
    /// This is how a device agent (or a test standing in for one) listens on
    /// its own command channel, independently of the router.
    #[must_use]
    pub fn open(&self, channel: Channel) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            channel,
        }
    }

    /// Spawn the inbound pump: delivers every message whose channel is
    /// subscribed to the router, until the bus is dropped.
    pub fn spawn_inbound(self: &Arc<Self>, router: Arc<MessageRouter>) -> JoinHandle<()> {
        let mut receiver = self.sender.subscribe();
        let subscriptions = Arc::clone(&self.subscriptions);

        tokio::spawn(async move {
            loop {
                let message = match receiver.recv().await {
                    Ok(m) => m,
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Bus closed, stopping inbound pump");
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(lagged = count, "Inbound pump lagged, messages dropped");
                        continue;
                    }
                };

                let subscribed = subscriptions
                    .read()
                    .map(|subs| subs.contains(&message.channel))
                    .unwrap_or(false);

                if subscribed {
                    let channel = message.channel.clone();
                    router.dispatch(&channel, &message);
                }
            }
        })
    }

    /// Number of channels currently subscribed.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Total messages published on this bus.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// The channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusTransport for InMemoryBus {
    async fn publish(&self, message: WireMessage) -> Result<usize, BusError> {
        let channel = message.channel.clone();
        let kind = message.kind();

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(message) {
            Ok(receiver_count) => {
                debug!(
                    channel = %channel,
                    kind = ?kind,
                    receivers = receiver_count,
                    "Message published"
                );
                Ok(receiver_count)
            }
            Err(e) => {
                // No receivers at all - message is dropped
                warn!(
                    channel = %channel,
                    kind = ?kind,
                    error = %e,
                    "Message dropped (no receivers)"
                );
                Ok(0)
            }
        }
    }

    fn subscribe(&self, channel: &Channel) {
        if let Ok(mut subs) = self.subscriptions.write() {
            subs.insert(channel.clone());
        }
        debug!(channel = %channel, "Subscribed");
    }

    fn unsubscribe(&self, channel: &Channel) {
        if let Ok(mut subs) = self.subscriptions.write() {
            subs.remove(channel);
        }
        debug!(channel = %channel, "Unsubscribed");
    }
}

/// A channel-filtered receive handle on the in-memory transport.
pub struct Subscription {
    receiver: broadcast::Receiver<WireMessage>,
    channel: Channel,
}

impl Subscription {
    /// Receive the next message addressed to this subscription's channel.
    ///
    /// Returns `None` when the bus is dropped. Lagged receivers skip the
    /// dropped messages and keep going.
    pub async fn recv(&mut self) -> Option<WireMessage> {
        loop {
            let message = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscription lagged, messages dropped");
                    continue;
                }
            };

            if message.channel == self.channel {
                return Some(message);
            }
        }
    }

    /// The channel this subscription is filtered to.
    #[must_use]
    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}
