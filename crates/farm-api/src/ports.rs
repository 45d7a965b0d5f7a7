//! Narrow interfaces to external collaborators.
//!
//! The storage service and the device/group directory are separate systems;
//! this unit only depends on the operations below. Default adapters live in
//! [`crate::adapters`].

use async_trait::async_trait;
use bytes::Bytes;
use farm_types::Device;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors at the storage-backend boundary.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Transport-level failure talking to the backend.
    #[error("storage request failed: {0}")]
    Request(String),
    /// The backend answered with an unexpected body shape.
    #[error("unexpected storage response: {0}")]
    BadResponse(String),
    /// The backend did not answer within the budget.
    #[error("storage request timed out")]
    Timeout,
}

/// Errors at the directory boundary.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The directory backend failed.
    #[error("directory lookup failed: {0}")]
    Lookup(String),
}

/// Caller session headers forwarded to the storage backend on manifest
/// lookups. Authentication itself is established upstream.
#[derive(Debug, Clone, Default)]
pub struct SessionHeaders {
    pub cookie: Option<String>,
    pub csrf_token: Option<String>,
    pub user_agent: Option<String>,
}

/// The storage backend's reply to a relayed upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReply {
    /// Whether the backend accepted the upload.
    pub success: bool,
    /// Backend status code for the relay response.
    #[serde(skip)]
    pub status: u16,
    /// Failure description, when `success` is false.
    #[serde(default)]
    pub description: Option<String>,
    /// Stored resources by form field name. Entry order is the backend's.
    #[serde(default)]
    pub resources: serde_json::Map<String, Value>,
}

impl UploadReply {
    /// Reference to the first stored resource.
    ///
    /// Selection is positional, not keyed: the form field name the backend
    /// keys the map by is arbitrary.
    #[must_use]
    pub fn first_resource_href(&self) -> Option<&str> {
        self.resources
            .values()
            .next()
            .and_then(|resource| resource.get("href"))
            .and_then(Value::as_str)
    }
}

/// Storage backend boundary: upload relay and manifest lookup.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Forward an uploaded package body to the backend, returning its parsed
    /// reply plus the status it reported.
    async fn relay_upload(
        &self,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<UploadReply, StorageError>;

    /// Fetch the manifest for a stored resource, forwarding the caller's
    /// session headers. Implementations enforce the configured per-call
    /// budget.
    async fn fetch_manifest(
        &self,
        href: &str,
        session: &SessionHeaders,
    ) -> Result<Value, StorageError>;
}

/// Device/group directory boundary.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// Look up a device by serial, scoped to the requester's subscribed
    /// groups. Devices outside those groups are invisible.
    async fn load_device(
        &self,
        subscribed_groups: &[String],
        serial: &str,
    ) -> Result<Option<Device>, DirectoryError>;
}
