//! Bus channel addresses.
//!
//! A channel names a destination on the message bus: either a device agent's
//! command channel or a single transaction's reply path.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix reserved for transaction reply channels.
///
/// Device channels are derived from provisioning data and never start with
/// this prefix, so a transaction channel cannot collide with device-addressed
/// traffic.
pub const TRANSACTION_PREFIX: &str = "tx.";

/// A named address on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    /// Create a channel from an existing address (e.g. a device channel from
    /// the directory).
    pub fn named(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Generate a fresh, globally unique transaction reply channel.
    #[must_use]
    pub fn transaction() -> Self {
        Self(format!("{}{}", TRANSACTION_PREFIX, Uuid::new_v4()))
    }

    /// Whether this channel addresses a transaction reply path.
    #[must_use]
    pub fn is_transaction(&self) -> bool {
        self.0.starts_with(TRANSACTION_PREFIX)
    }

    /// The raw address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Channel {
    fn from(address: &str) -> Self {
        Self::named(address)
    }
}
