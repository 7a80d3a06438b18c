// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::device_gateway::DeviceGateway;
use crate::application::energy_service::EnergyService;
use crate::application::key_value_store::KeyValueStore;
use crate::application::monitor::Monitor;
use crate::application::telemetry_service::TelemetryService;
use crate::domain::energy::Tariff;
use crate::infrastructure::config::{GatewayMode, MonitorConfig, StorageBackend, load_monitor_config};
use crate::infrastructure::http_gateway::HttpGateway;
use crate::infrastructure::log_notifier::LogNotifier;
use crate::infrastructure::simulated_gateway::SimulatedGateway;
use crate::infrastructure::store::{FileStore, MemoryStore};
use crate::presentation::app_state::AppState;

fn build_gateway(config: &MonitorConfig) -> Arc<dyn DeviceGateway> {
    match config.telemetry.mode {
        GatewayMode::Simulated => Arc::new(SimulatedGateway::new(
            config.telemetry.devices.clone(),
            config.telemetry.tick(),
        )),
        // validate() guarantees a URL in http mode
        GatewayMode::Http => Arc::new(HttpGateway::new(
            config.telemetry.gateway_url.clone().unwrap_or_default(),
        )),
    }
}

fn build_store(config: &MonitorConfig) -> Arc<dyn KeyValueStore> {
    match config.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => {
            let store = FileStore::new(config.storage.dir.clone());
            tracing::info!("Persisting state under {}", store.dir().display());
            Arc::new(store)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_monitor_config()?;

    // Create adapters (infrastructure layer)
    let gateway = build_gateway(&config);
    let store = build_store(&config);
    tracing::info!("Using {} device gateway", gateway.kind());

    // Create services (application layer)
    let telemetry = TelemetryService::new(gateway);
    let energy = EnergyService::new(store, Tariff::new(config.pricing.rate_per_kwh));
    energy.load().await;

    let monitor = Monitor::new(telemetry, energy, Arc::new(LogNotifier));
    monitor.start(config.telemetry.tick(), config.telemetry.refresh()).await;

    // Create application state and router (presentation layer)
    let state = Arc::new(AppState {
        monitor: monitor.clone(),
    });
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting energy-monitor service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.stop().await;
    tracing::info!("Energy monitor stopped");
    Ok(())
}
