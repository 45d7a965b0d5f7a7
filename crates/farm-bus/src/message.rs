//! # Wire Messages
//!
//! The envelope and payload kinds exchanged over the bus. Only the kinds
//! needed for install dispatch and transaction correlation are defined here;
//! the transport's wire encoding beyond these shapes is out of scope.

use farm_types::Channel;
use serde::{Deserialize, Serialize};

/// Generic envelope exchanged over the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Destination channel.
    pub channel: Channel,
    /// Reply channel for correlated exchanges. Set on outbound commands so
    /// the device agent knows where to address its acknowledgement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Channel>,
    /// The message payload.
    pub payload: Payload,
}

impl WireMessage {
    /// Wrap an install command for a device, addressed so its reply comes
    /// back on `reply_to`.
    pub fn install(device_channel: Channel, reply_to: Channel, command: InstallCommand) -> Self {
        Self {
            channel: device_channel,
            reply_to: Some(reply_to),
            payload: Payload::InstallCommand(command),
        }
    }

    /// An acknowledgement addressed to a transaction reply channel.
    pub fn transaction_done(
        transaction_channel: Channel,
        success: bool,
        data: serde_json::Value,
    ) -> Self {
        Self {
            channel: transaction_channel,
            reply_to: None,
            payload: Payload::TransactionDone(TransactionDone { success, data }),
        }
    }

    /// The kind tag of this message's payload.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }
}

/// All payload kinds that flow through this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Outbound: install the referenced package on the addressed device.
    InstallCommand(InstallCommand),
    /// Inbound: a device agent finished (or refused) a correlated command.
    TransactionDone(TransactionDone),
}

impl Payload {
    /// The kind tag, used as the router's dispatch key.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::InstallCommand(_) => MessageKind::InstallCommand,
            Self::TransactionDone(_) => MessageKind::TransactionDone,
        }
    }
}

/// Message-type tag for router registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    InstallCommand,
    TransactionDone,
}

/// Install a package on a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallCommand {
    /// Storage-backend reference to the uploaded package.
    pub href: String,
    /// Replace an already-installed package with the same identity.
    pub overwrite: bool,
    /// The package manifest, serialized as text.
    pub manifest: String,
}

/// A device agent's acknowledgement of a correlated command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDone {
    /// Whether the command completed on the device.
    pub success: bool,
    /// Opaque result payload; shape depends on the command.
    #[serde(default)]
    pub data: serde_json::Value,
}
