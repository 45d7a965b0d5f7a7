//! Transaction correlation: fire-and-forget bus sends made awaitable.
//!
//! One transaction is one correlated command/acknowledgement exchange over
//! the bus, identified by a unique `tx.`-prefixed reply channel. The
//! correlator races the acknowledgement against a timeout budget, resolves
//! exactly once, and releases the router registration and the channel
//! subscription on every exit path.

use farm_bus::{
    BusError, BusTransport, Channel, InstallCommand, MessageKind, MessageRouter, Payload,
    WireMessage,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Errors from a correlated dispatch.
#[derive(Debug, thiserror::Error)]
pub enum TxnError {
    /// The device refused the command or never acknowledged it within the
    /// budget. The two cases are deliberately indistinguishable here; they
    /// are separated only in tracing fields and [`TxnStats`].
    #[error("device did not complete the operation")]
    Unresponsive,

    /// The outbound publish failed at the transport.
    #[error("bus publish failed: {0}")]
    Bus(#[from] BusError),
}

/// Counters over the life of the correlator.
#[derive(Debug, Default)]
pub struct TxnStats {
    /// Transactions created.
    pub started: AtomicU64,
    /// Resolved by a successful acknowledgement.
    pub succeeded: AtomicU64,
    /// Resolved by an explicit negative acknowledgement.
    pub failed: AtomicU64,
    /// Resolved by timer expiry.
    pub timed_out: AtomicU64,
}

/// How a transaction settled. Timeout is not a resolution the handler can
/// produce; it is the absence of one within the budget.
enum Resolution {
    Succeeded(serde_json::Value),
    Failed,
}

/// Single-assignment settle cell: the first writer takes the sender, later
/// triggers find it gone and no-op.
type SettleCell = Mutex<Option<oneshot::Sender<Resolution>>>;

fn settle(cell: &SettleCell, resolution: Resolution) -> bool {
    match cell.lock().take() {
        Some(sender) => sender.send(resolution).is_ok(),
        None => false,
    }
}

/// Converts a fire-and-forget bus send into an awaitable, timeout-bound,
/// exactly-once-resolved operation.
pub struct TransactionCorrelator {
    bus: Arc<dyn BusTransport>,
    router: Arc<MessageRouter>,
    stats: Arc<TxnStats>,
}

impl TransactionCorrelator {
    /// Create a correlator over the given transport and router.
    pub fn new(bus: Arc<dyn BusTransport>, router: Arc<MessageRouter>) -> Self {
        Self {
            bus,
            router,
            stats: Arc::new(TxnStats::default()),
        }
    }

    /// Dispatch `command` to `device_channel` and await the device's
    /// acknowledgement under `budget`.
    ///
    /// Flow:
    /// 1. Generate a fresh `tx.` reply channel.
    /// 2. Subscribe the bus to it and register a done-message handler.
    /// 3. Publish the command enveloped with the reply channel.
    /// 4. Race the acknowledgement against the budget.
    /// 5. Unregister the handler and unsubscribe the channel, on every path.
    ///
    /// Returns the acknowledgement's payload on success. An explicit
    /// negative acknowledgement and a timeout both surface as
    /// [`TxnError::Unresponsive`].
    pub async fn dispatch_and_await(
        &self,
        device_channel: &Channel,
        command: InstallCommand,
        budget: Duration,
    ) -> Result<serde_json::Value, TxnError> {
        let reply = Channel::transaction();
        let (sender, receiver) = oneshot::channel();
        let cell: Arc<SettleCell> = Arc::new(Mutex::new(Some(sender)));

        self.stats.started.fetch_add(1, Ordering::Relaxed);
        self.bus.subscribe(&reply);

        let handler_cell = Arc::clone(&cell);
        let handler_id = self.router.register(
            reply.clone(),
            MessageKind::TransactionDone,
            Arc::new(move |_channel, message: &WireMessage| {
                let Payload::TransactionDone(done) = &message.payload else {
                    return;
                };
                let resolution = if done.success {
                    Resolution::Succeeded(done.data.clone())
                } else {
                    Resolution::Failed
                };
                settle(&handler_cell, resolution);
            }),
        );

        debug!(channel = %reply, device = %device_channel, "Transaction started");

        let published = self
            .bus
            .publish(WireMessage::install(
                device_channel.clone(),
                reply.clone(),
                command,
            ))
            .await;

        let outcome = match published {
            Err(e) => Err(TxnError::Bus(e)),
            Ok(_receivers) => match tokio::time::timeout(budget, receiver).await {
                Ok(Ok(Resolution::Succeeded(data))) => {
                    self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                    debug!(channel = %reply, "Transaction succeeded");
                    Ok(data)
                }
                Ok(Ok(Resolution::Failed)) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(channel = %reply, device = %device_channel, "Device rejected command");
                    Err(TxnError::Unresponsive)
                }
                // The cell holds the sender until someone settles, so a recv
                // error means the cell itself was torn down.
                Ok(Err(_)) => Err(TxnError::Unresponsive),
                Err(_elapsed) => {
                    // Take the sender so a late acknowledgement is a no-op.
                    cell.lock().take();
                    self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        channel = %reply,
                        device = %device_channel,
                        budget_ms = budget.as_millis(),
                        "Transaction timed out"
                    );
                    Err(TxnError::Unresponsive)
                }
            },
        };

        // Teardown on every path. The timer needs no explicit cancel: the
        // timeout future is dropped with this scope.
        self.router.unregister(handler_id);
        self.bus.unsubscribe(&reply);

        outcome
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> &TxnStats {
        &self.stats
    }

    /// Live router registrations (all transactions, all callers).
    #[must_use]
    pub fn live_handlers(&self) -> usize {
        self.router.handler_count()
    }
}
