//! HTTP service assembly.
//!
//! Wires the install pipeline into an axum router and runs the server with
//! graceful shutdown. The service owns no business logic; it is the edge
//! that turns sockets into pipeline runs.

use crate::domain::config::{ApiConfig, ConfigError};
use crate::install::{install_handler, InstallPipeline};
use crate::middleware::{attach_requester, validate_content_length};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Service-level failures.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// State shared by handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InstallPipeline>,
    pub max_upload_size: u64,
}

/// Build the unit's router over the given state.
///
/// Layer order, outermost first: request tracing, declared-length gate,
/// identity extraction, handler.
pub fn build_router(state: AppState) -> Router {
    let max_upload_size = state.max_upload_size;
    Router::new()
        .route("/api/v1/devices/:serial/install", post(install_handler))
        .layer(from_fn(attach_requester))
        .layer(from_fn_with_state(max_upload_size, validate_content_length))
        .with_state(state)
        .route("/api/v1/health", get(health))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

/// The running HTTP edge of the unit.
pub struct ApiService {
    config: ApiConfig,
    state: AppState,
}

impl ApiService {
    /// Validate config and assemble the service.
    pub fn new(config: ApiConfig, pipeline: Arc<InstallPipeline>) -> Result<Self, ServiceError> {
        config.validate()?;
        let state = AppState {
            pipeline,
            max_upload_size: config.limits.max_upload_size,
        };
        Ok(Self { config, state })
    }

    /// The assembled router, for embedding or in-process testing.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %addr, "API unit listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API unit stopped");
        Ok(())
    }
}
