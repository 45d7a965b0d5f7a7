// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! # Farm API - HTTP control-plane unit
//!
//! Bridges synchronous HTTP install requests to asynchronous device-agent
//! commands over the message bus, and correlates the eventual
//! acknowledgement back to the HTTP caller under a timeout budget.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         FARM API                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  POST /api/v1/devices/{serial}/install                       │
//! │         │                                                    │
//! │  ┌──────┴───────────────────────────┐                        │
//! │  │  Content-length pre-validation   │                        │
//! │  └──────┬───────────────────────────┘                        │
//! │         │                                                    │
//! │  ┌──────┴───────────────────────────┐    ┌────────────────┐  │
//! │  │     Install Dispatch Pipeline    │───→│ Storage backend│  │
//! │  │  relay → manifest → ownership    │    │ (upload +      │  │
//! │  │        → dispatch → respond      │    │  manifest)     │  │
//! │  └──────┬───────────────────────────┘    └────────────────┘  │
//! │         │                                                    │
//! │  ┌──────┴───────────────────────────┐                        │
//! │  │     Transaction Correlator       │                        │
//! │  │  (settle-once via oneshot)       │                        │
//! │  └──────┬───────────────────────────┘                        │
//! └─────────┼────────────────────────────────────────────────────┘
//!           │
//!      Message Bus
//!           │
//!           ▼
//!     Device agents
//! ```
//!
//! # External collaborators
//!
//! Authentication, the device/group directory database, and the storage
//! service are consumed through narrow interfaces ([`ports`]); their
//! internals are out of scope for this unit.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod install;
pub mod middleware;
pub mod ports;
pub mod service;

// Re-exports for public API
pub use domain::config::ApiConfig;
pub use domain::error::{InstallError, InstallResponse};
pub use domain::transaction::{TransactionCorrelator, TxnError, TxnStats};
pub use install::{InstallPipeline, InstallRequest};
pub use ports::{DeviceDirectory, SessionHeaders, StorageBackend};
pub use service::{build_router, ApiService, AppState, ServiceError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
