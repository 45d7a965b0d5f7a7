//! # Farmgate Runtime
//!
//! The runnable API unit. Startup sequence:
//!
//! 1. Initialize logging (env-filter controlled, default `info`).
//! 2. Load configuration: optional JSON file argument, then `FARM_API_*`
//!    environment overrides, then validation.
//! 3. Wire the in-process bus, message router, inbound pump, transaction
//!    correlator, storage adapter, and device directory.
//! 4. Serve HTTP until Ctrl+C, then shut down gracefully.

use anyhow::{Context, Result};
use farm_api::adapters::{HttpStorage, InMemoryDirectory};
use farm_api::{ApiConfig, ApiService, InstallPipeline, TransactionCorrelator};
use farm_bus::{BusTransport, InMemoryBus, MessageRouter};
use farm_types::Device;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();
}

fn load_config() -> Result<ApiConfig> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {path}"))?
        }
        None => ApiConfig::default(),
    };

    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Seed the directory from a JSON device list, when one is provided.
///
/// In a full deployment the directory is fed by the platform database; a
/// standalone unit reads its fleet from `FARM_API_DEVICES` instead.
fn seed_directory(directory: &InMemoryDirectory) -> Result<()> {
    let Ok(path) = std::env::var("FARM_API_DEVICES") else {
        warn!("FARM_API_DEVICES not set; starting with an empty device directory");
        return Ok(());
    };

    let raw =
        std::fs::read_to_string(&path).with_context(|| format!("reading device list {path}"))?;
    let devices: Vec<Device> =
        serde_json::from_str(&raw).with_context(|| format!("parsing device list {path}"))?;

    let count = devices.len();
    for device in devices {
        directory.upsert(device);
    }
    info!(count, path = %path, "Device directory seeded");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = load_config()?;
    info!(
        addr = %config.http_addr(),
        storage = %config.storage.url,
        "Starting Farmgate API unit"
    );

    // Bus plumbing: transport, router, and the inbound pump feeding it.
    let bus = Arc::new(InMemoryBus::new());
    let router = Arc::new(MessageRouter::new());
    let _pump = bus.spawn_inbound(Arc::clone(&router));

    let correlator = Arc::new(TransactionCorrelator::new(
        Arc::clone(&bus) as Arc<dyn BusTransport>,
        router,
    ));

    let storage = Arc::new(
        HttpStorage::new(&config.storage, config.timeouts.manifest_fetch)
            .context("building storage adapter")?,
    );

    let directory = Arc::new(InMemoryDirectory::new());
    seed_directory(&directory)?;

    let pipeline = Arc::new(InstallPipeline::new(
        storage,
        directory,
        correlator,
        config.timeouts.dispatch,
    ));

    let service = ApiService::new(config, pipeline).context("assembling API service")?;
    service
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("serving HTTP")?;

    Ok(())
}
