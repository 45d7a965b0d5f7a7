//! Install dispatch pipeline.
//!
//! A strictly ordered sequence with terminal outcomes:
//!
//! ```text
//! UploadRelay → ManifestFetch → OwnershipCheck → Dispatch → Respond
//! ```
//!
//! Each stage either advances or terminates the run with a classified
//! [`InstallError`]; the HTTP handler renders exactly one response from the
//! result. No stage retries; a failed request is isolated to its own
//! pipeline instance.

use crate::domain::error::{InstallError, InstallResponse};
use crate::domain::transaction::{TransactionCorrelator, TxnError};
use crate::ports::{DeviceDirectory, SessionHeaders, StorageBackend};
use crate::service::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use bytes::Bytes;
use farm_bus::InstallCommand;
use farm_types::Requester;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One unit of work flowing through the pipeline. Constructed at HTTP entry,
/// discarded after the response is rendered, never persisted.
pub struct InstallRequest {
    /// Target device serial.
    pub serial: String,
    /// Identity of the caller, established upstream.
    pub requester: Requester,
    /// Session headers forwarded on the manifest lookup.
    pub session: SessionHeaders,
    /// Content type of the uploaded body.
    pub content_type: Option<String>,
    /// The uploaded package bytes.
    pub body: Bytes,
}

/// The ordered install workflow over its three collaborators.
pub struct InstallPipeline {
    storage: Arc<dyn StorageBackend>,
    directory: Arc<dyn DeviceDirectory>,
    correlator: Arc<TransactionCorrelator>,
    dispatch_timeout: Duration,
}

impl InstallPipeline {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        directory: Arc<dyn DeviceDirectory>,
        correlator: Arc<TransactionCorrelator>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            directory,
            correlator,
            dispatch_timeout,
        }
    }

    /// Run all stages for one request.
    ///
    /// Returns the device's completion payload, or the classified outcome
    /// that terminated the run.
    pub async fn run(&self, request: InstallRequest) -> Result<serde_json::Value, InstallError> {
        // Stage 1: relay the upload to the storage backend.
        let reply = self
            .storage
            .relay_upload(request.body, request.content_type.as_deref())
            .await
            .map_err(|e| InstallError::internal(format!("upload relay: {e}")))?;

        if !reply.success {
            return Err(InstallError::UploadRejected {
                status: reply.status,
                description: reply
                    .description
                    .unwrap_or_else(|| "Upload rejected".to_string()),
            });
        }

        let href = reply
            .first_resource_href()
            .ok_or_else(|| InstallError::internal("storage reply carried no resource href"))?
            .to_string();
        debug!(serial = %request.serial, href = %href, "Upload stored");

        // Stage 2: fetch the manifest for the stored package.
        let manifest = self
            .storage
            .fetch_manifest(&href, &request.session)
            .await
            .map_err(|e| InstallError::internal(format!("manifest fetch: {e}")))?;

        if manifest_is_empty(&manifest) {
            return Err(InstallError::ManifestUnavailable);
        }

        // Stage 3: ownership gate, scoped to the requester's groups.
        let mut device = self
            .directory
            .load_device(&request.requester.subscribed_groups, &request.serial)
            .await
            .map_err(|e| InstallError::internal(format!("directory: {e}")))?
            .ok_or(InstallError::NotOwned)?;

        device.normalize(&request.requester);
        if !device.is_owned_by(&request.requester) {
            return Err(InstallError::NotOwned);
        }

        // Stage 4: dispatch to the device and await its acknowledgement.
        let manifest_text = serde_json::to_string(&manifest)
            .map_err(|e| InstallError::internal(format!("manifest serialization: {e}")))?;
        let command = InstallCommand {
            href,
            overwrite: true,
            manifest: manifest_text,
        };

        match self
            .correlator
            .dispatch_and_await(&device.channel, command, self.dispatch_timeout)
            .await
        {
            Ok(data) => {
                info!(serial = %request.serial, requester = %request.requester.email, "APK installed");
                Ok(data)
            }
            Err(TxnError::Unresponsive) => Err(InstallError::DeviceUnresponsive),
            Err(e @ TxnError::Bus(_)) => Err(InstallError::internal(e.to_string())),
        }
    }
}

/// Empty manifests come back as `""` from the backend; treat null the same.
fn manifest_is_empty(manifest: &serde_json::Value) -> bool {
    manifest.is_null() || manifest.as_str().is_some_and(str::is_empty)
}

/// `POST /api/v1/devices/{serial}/install`
///
/// The requester identity is inserted as a request extension by the
/// authentication layer fronting this unit.
pub async fn install_handler(
    State(state): State<AppState>,
    Path(serial): Path<String>,
    requester: Option<Extension<Requester>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(Extension(requester)) = requester else {
        return InstallError::internal("request reached handler without requester identity")
            .into_response();
    };

    let request = InstallRequest {
        serial,
        requester,
        session: session_headers(&headers),
        content_type: header_string(&headers, header::CONTENT_TYPE),
        body,
    };

    match state.pipeline.run(request).await {
        Ok(_data) => (StatusCode::OK, Json(InstallResponse::installed())).into_response(),
        Err(err) => err.into_response(),
    }
}

fn session_headers(headers: &HeaderMap) -> SessionHeaders {
    SessionHeaders {
        cookie: header_string(headers, header::COOKIE),
        csrf_token: headers
            .get("x-csrf-token")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        user_agent: header_string(headers, header::USER_AGENT),
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
