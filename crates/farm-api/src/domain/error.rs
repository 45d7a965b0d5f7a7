//! Install pipeline outcome taxonomy.
//!
//! Every terminal outcome of the install dispatch pipeline is one of these
//! variants; each carries its transport-level status and a description safe
//! to show the caller. There is no exception-style control flow: stages
//! short-circuit with a variant and a single mapping renders the response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Fixed safe descriptions. Internal detail never reaches these.
mod descriptions {
    pub const NO_MANIFEST: &str = "Unable to retrieve manifest";
    pub const NOT_RESPONDING: &str = "Device is not responding";
    pub const NOT_OWNED: &str = "You cannot install on this device. Not owned by you";
    pub const SERVER_ERROR: &str = "ServerError";
    pub const INSTALLED: &str = "APK installed successfully";
}

/// Classified terminal outcome of a failed install pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The storage backend rejected the upload. The backend's status and
    /// description are forwarded verbatim.
    #[error("upload rejected by storage backend: {description}")]
    UploadRejected {
        /// Status reported by the backend.
        status: u16,
        /// Backend's failure description, passed through.
        description: String,
    },

    /// The fetched manifest was empty.
    #[error("manifest unavailable")]
    ManifestUnavailable,

    /// The device is not among the requester's owned devices.
    #[error("device not owned by requester")]
    NotOwned,

    /// The device never completed the command: explicit refusal and timeout
    /// are not distinguished in this outcome.
    #[error("device unresponsive")]
    DeviceUnresponsive,

    /// Anything unclassified. Full detail is logged server-side only; the
    /// caller sees a generic description.
    #[error("internal error: {0}")]
    Internal(String),
}

impl InstallError {
    /// Transport-level status for this outcome.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            // A backend that reports failure alongside HTTP 200 gives us no
            // usable status; 200 is reserved for a completed install.
            Self::UploadRejected { status: 200, .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UploadRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::ManifestUnavailable | Self::DeviceUnresponsive => StatusCode::BAD_REQUEST,
            Self::NotOwned => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Description safe to render to the caller.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::UploadRejected { status: 200, .. } => descriptions::SERVER_ERROR.to_string(),
            Self::UploadRejected { description, .. } => description.clone(),
            Self::ManifestUnavailable => descriptions::NO_MANIFEST.to_string(),
            Self::NotOwned => descriptions::NOT_OWNED.to_string(),
            Self::DeviceUnresponsive => descriptions::NOT_RESPONDING.to_string(),
            Self::Internal(_) => descriptions::SERVER_ERROR.to_string(),
        }
    }

    /// Shorthand for wrapping collaborator failures.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }
}

impl IntoResponse for InstallError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref detail) = self {
            tracing::error!(detail = %detail, "Error installing apk");
        }
        (
            self.status(),
            Json(InstallResponse {
                success: false,
                description: self.description(),
            }),
        )
            .into_response()
    }
}

/// The one response body shape this unit renders, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallResponse {
    /// Whether the install completed.
    pub success: bool,
    /// Human-readable outcome description.
    pub description: String,
}

impl InstallResponse {
    /// The canonical success body.
    #[must_use]
    pub fn installed() -> Self {
        Self {
            success: true,
            description: descriptions::INSTALLED.to_string(),
        }
    }
}
