//! HTTP storage backend adapter.
//!
//! Thin pass-through: relays the uploaded package body to the storage
//! service's upload plugin and performs the manifest lookup with the
//! caller's forwarded session headers.

use crate::domain::config::StorageConfig;
use crate::ports::{SessionHeaders, StorageBackend, StorageError, UploadReply};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Storage backend over reqwest.
pub struct HttpStorage {
    client: reqwest::Client,
    base_url: String,
    upload_path: String,
    manifest_timeout: Duration,
}

impl HttpStorage {
    /// Build an adapter from config.
    pub fn new(config: &StorageConfig, manifest_timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            upload_path: config.upload_path.clone(),
            manifest_timeout,
        })
    }

    fn classify(e: reqwest::Error) -> StorageError {
        if e.is_timeout() {
            StorageError::Timeout
        } else {
            StorageError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl StorageBackend for HttpStorage {
    async fn relay_upload(
        &self,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<UploadReply, StorageError> {
        let url = format!("{}{}", self.base_url, self.upload_path);
        debug!(url = %url, bytes = body.len(), "Relaying upload to storage");

        let mut request = self.client.post(&url).body(body);
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        let response = request.send().await.map_err(Self::classify)?;
        let status = response.status().as_u16();

        let mut reply: UploadReply = response
            .json()
            .await
            .map_err(|e| StorageError::BadResponse(e.to_string()))?;
        reply.status = status;
        Ok(reply)
    }

    async fn fetch_manifest(
        &self,
        href: &str,
        session: &SessionHeaders,
    ) -> Result<Value, StorageError> {
        let url = format!("{}{}/manifest", self.base_url, href);
        debug!(url = %url, "Fetching manifest");

        let mut request = self.client.get(&url).timeout(self.manifest_timeout);
        if let Some(cookie) = &session.cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        if let Some(token) = &session.csrf_token {
            request = request.header("x-csrf-token", token);
        }
        if let Some(user_agent) = &session.user_agent {
            request = request.header(reqwest::header::USER_AGENT, user_agent);
        }

        let response = request.send().await.map_err(Self::classify)?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| StorageError::BadResponse(e.to_string()))?;

        body.get("manifest")
            .cloned()
            .ok_or_else(|| StorageError::BadResponse("missing 'manifest' field".into()))
    }
}
