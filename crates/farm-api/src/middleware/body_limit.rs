//! Content-length pre-validation.
//!
//! Rejects uploads before any byte reaches the storage backend: a missing or
//! malformed `content-length` is a 400, an oversize declaration a 413. A
//! client that lies about its length still gets cut off by the relay's body
//! cap; this gate only stops honest-but-oversize uploads early.

use crate::domain::error::InstallResponse;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Declared-length gate, parameterized by the configured maximum.
pub async fn validate_content_length(
    State(max_upload_size): State<u64>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match declared {
        None => reject(StatusCode::BAD_REQUEST, "Invalid content-length header"),
        Some(length) if length > max_upload_size => {
            reject(StatusCode::PAYLOAD_TOO_LARGE, "File is too big")
        }
        Some(_) => next.run(request).await,
    }
}

fn reject(status: StatusCode, description: &str) -> Response {
    (
        status,
        Json(InstallResponse {
            success: false,
            description: description.to_string(),
        }),
    )
        .into_response()
}
