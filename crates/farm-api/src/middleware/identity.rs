//! Requester identity extraction.
//!
//! This unit sits behind an authenticating proxy that stamps the verified
//! identity onto forwarded requests as headers. The middleware turns those
//! headers into a [`Requester`] extension; requests without an identity
//! never reach a handler.

use crate::domain::error::InstallResponse;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use farm_types::Requester;

const EMAIL_HEADER: &str = "x-requester-email";
const NAME_HEADER: &str = "x-requester-name";
const GROUPS_HEADER: &str = "x-requester-groups";

/// Attach the forwarded identity as a request extension.
pub async fn attach_requester(mut request: Request, next: Next) -> Response {
    let Some(requester) = requester_from_headers(request.headers()) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(InstallResponse {
                success: false,
                description: "Unauthorized access".to_string(),
            }),
        )
            .into_response();
    };

    request.extensions_mut().insert(requester);
    next.run(request).await
}

fn requester_from_headers(headers: &HeaderMap) -> Option<Requester> {
    let email = header_value(headers, EMAIL_HEADER)?;
    if email.is_empty() {
        return None;
    }

    let name = header_value(headers, NAME_HEADER)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.clone());
    let subscribed_groups = header_value(headers, GROUPS_HEADER)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(Requester {
        email,
        name,
        subscribed_groups,
    })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
