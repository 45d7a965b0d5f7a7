//! In-memory device directory.
//!
//! The production directory is a database owned by another unit; this
//! adapter serves single-node deployments and tests behind the same trait.

use crate::ports::{DeviceDirectory, DirectoryError};
use async_trait::async_trait;
use farm_types::Device;
use parking_lot::RwLock;
use std::collections::HashMap;

/// HashMap-backed directory.
#[derive(Default)]
pub struct InMemoryDirectory {
    devices: RwLock<HashMap<String, Device>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a device record.
    pub fn upsert(&self, device: Device) {
        self.devices.write().insert(device.serial.clone(), device);
    }

    /// Remove a device record.
    pub fn remove(&self, serial: &str) {
        self.devices.write().remove(serial);
    }

    /// Number of known devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}

#[async_trait]
impl DeviceDirectory for InMemoryDirectory {
    async fn load_device(
        &self,
        subscribed_groups: &[String],
        serial: &str,
    ) -> Result<Option<Device>, DirectoryError> {
        let devices = self.devices.read();
        Ok(devices
            .get(serial)
            .filter(|device| subscribed_groups.iter().any(|g| *g == device.group))
            .cloned())
    }
}
