//! API unit configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main API unit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Storage backend configuration
    pub storage: StorageConfig,
    /// Request limits
    pub limits: LimitsConfig,
    /// Timeout budgets
    pub timeouts: TimeoutConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            storage: StorageConfig::default(),
            limits: LimitsConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.url.is_empty() {
            return Err(ConfigError::InvalidStorage("url cannot be empty".into()));
        }
        if !self.storage.url.starts_with("http://") && !self.storage.url.starts_with("https://") {
            return Err(ConfigError::InvalidStorage(format!(
                "url must be http(s), got '{}'",
                self.storage.url
            )));
        }

        if self.limits.max_upload_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_upload_size cannot be 0".into(),
            ));
        }

        if self.timeouts.dispatch.as_millis() == 0 {
            return Err(ConfigError::InvalidTimeout(
                "dispatch timeout cannot be 0".into(),
            ));
        }
        if self.timeouts.manifest_fetch.as_millis() == 0 {
            return Err(ConfigError::InvalidTimeout(
                "manifest_fetch timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Apply `FARM_API_`-prefixed environment overrides.
    ///
    /// Recognized: `FARM_API_PORT`, `FARM_API_STORAGE_URL`,
    /// `FARM_API_STORAGE_UPLOAD_PATH`, `FARM_API_MAX_UPLOAD_SIZE`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("FARM_API_PORT") {
            if let Ok(port) = port.parse() {
                self.http.port = port;
            }
        }
        if let Ok(url) = std::env::var("FARM_API_STORAGE_URL") {
            self.storage.url = url;
        }
        if let Ok(path) = std::env::var("FARM_API_STORAGE_UPLOAD_PATH") {
            self.storage.upload_path = path;
        }
        if let Ok(size) = std::env::var("FARM_API_MAX_UPLOAD_SIZE") {
            if let Ok(size) = size.parse() {
                self.limits.max_upload_size = size;
            }
        }
    }

    /// Get HTTP server bind address.
    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 7106)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 7106,
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the storage service.
    pub url: String,
    /// Path of the package upload plugin on the storage service.
    pub upload_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:7100".to_string(),
            upload_path: "/s/upload/apk".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max accepted upload size in bytes (default: 1GiB). A fronting proxy
    /// may enforce a separate limit; both must be raised together.
    pub max_upload_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 1024 * 1024 * 1024,
        }
    }
}

/// Timeout budgets. Fixed per-call budgets, not propagated deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for a device to acknowledge a dispatched command.
    #[serde(with = "humantime_serde")]
    pub dispatch: Duration,
    /// Budget for the manifest lookup against the storage backend.
    #[serde(with = "humantime_serde")]
    pub manifest_fetch: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            dispatch: Duration::from_secs(5),
            manifest_fetch: Duration::from_secs(5),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid storage backend settings
    #[error("invalid storage config: {0}")]
    InvalidStorage(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Humantime serde module for Duration serialization.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
