//! # Farm Bus - Message Bus for Device-Agent Communication
//!
//! The publish/subscribe layer connecting the control plane to remote device
//! agents.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐                       ┌──────────────┐
//! │  API unit    │                       │ Device agent │
//! │              │  publish(device ch.)  │              │
//! │              │ ──────────┐           │              │
//! └──────────────┘           │           └──────────────┘
//!        ▲                   ▼                  │
//!        │            ┌──────────────┐         │
//!        │  dispatch  │   Bus        │◄────────┘
//! ┌──────┴───────┐    │  transport   │  publish(tx. channel)
//! │ MessageRouter│◄───┤  (inbound)   │
//! └──────────────┘    └──────────────┘
//! ```
//!
//! Outbound commands are addressed to a device channel and carry the
//! transaction reply channel in the envelope; the device agent publishes its
//! acknowledgement to that reply channel, where the [`MessageRouter`]
//! delivers it to the registered handler.
//!
//! Messages arriving on a channel with no registered handler are dropped
//! without error: not every bus message corresponds to an active transaction.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod message;
pub mod router;
pub mod transport;

// Re-export main types
pub use farm_types::Channel;
pub use message::{InstallCommand, MessageKind, Payload, TransactionDone, WireMessage};
pub use router::{HandlerFn, HandlerId, MessageRouter};
pub use transport::{BusError, BusTransport, InMemoryBus, Subscription};

/// Maximum messages to buffer per receiver before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
