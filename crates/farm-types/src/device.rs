//! Device records and requester identity.
//!
//! The device/group directory itself lives behind a narrow interface in the
//! API unit; these are the records flowing across that boundary.

use crate::channel::Channel;
use serde::{Deserialize, Serialize};

/// An addressable remote device agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Serial identifier, unique within the farm.
    pub serial: String,
    /// Bus address commands for this device are sent to.
    pub channel: Channel,
    /// Email of the user currently holding the device, if any.
    pub owner: Option<String>,
    /// Group the device is provisioned into.
    pub group: String,
    /// Whether the requester of the current operation holds the device.
    /// Populated by [`Device::normalize`], never stored.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub using: bool,
}

impl Device {
    /// Normalize a directory record against the requester's context.
    ///
    /// Derives request-scoped fields (currently the `using` flag) from the
    /// stored record. Directory lookups return records as stored; handlers
    /// must normalize before consulting ownership.
    pub fn normalize(&mut self, requester: &Requester) {
        self.using = self
            .owner
            .as_deref()
            .is_some_and(|owner| owner == requester.email);
    }

    /// Ownership predicate: is the device held by this requester?
    #[must_use]
    pub fn is_owned_by(&self, requester: &Requester) -> bool {
        self.owner.as_deref() == Some(requester.email.as_str())
    }
}

/// The identity of the user issuing a request, established by the external
/// authentication layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    /// Primary identity key; ownership is matched on this.
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Groups the requester is subscribed to; device lookups are scoped to
    /// these.
    #[serde(default)]
    pub subscribed_groups: Vec<String>,
}
