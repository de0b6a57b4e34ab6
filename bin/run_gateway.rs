//! Venue Gateway
//!
//! Builds every configured venue adapter, starts their background initialization
//! and logs a ticker for each enabled pair once startup completes.
//!
//! Usage:
//!   cargo run --bin run_gateway
//!
//! Environment variables:
//!   GATEWAY_CONFIG             - config file path (default: config/gateway.toml)
//!   <VENUE>_API_KEY            - per-venue API key, e.g. ITBIT_API_KEY
//!   <VENUE>_API_SECRET         - per-venue API secret
//!   <VENUE>_CLIENT_ID          - per-venue client id (itBit user id)
//!   RUST_LOG                   - log filter (default: info)

use adapters::config::DEFAULT_CONFIG_PATH;
use adapters::traits::{AssetClass, VenueAdapter};
use adapters::{ConfigFilePairStore, GatewayConfig, MarketDataCache, PairStore, TaskOutcome, VenueRegistry, VenueSupervisor};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!("Starting venue gateway");

    // =================================================================
    // 1. Load Configuration
    // =================================================================

    let config_path = std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!("Loading configuration from: {}", config_path);
    let config = GatewayConfig::load(&config_path)
        .with_context(|| format!("Failed to load gateway configuration from {}", config_path))?;

    // =================================================================
    // 2. Build Adapters
    // =================================================================

    let cache = Arc::new(MarketDataCache::new());
    let pair_store: Arc<dyn PairStore> = Arc::new(ConfigFilePairStore::new(&config_path));
    let registry = VenueRegistry::from_config(&config, cache, Some(pair_store)).context("Failed to build venues")?;

    let enabled = registry.enabled();
    if enabled.is_empty() {
        warn!("No enabled venues configured");
        return Ok(());
    }

    // =================================================================
    // 3. Start Venues
    // =================================================================

    let mut supervisor = VenueSupervisor::new();
    supervisor.start_all(enabled.iter().cloned());

    let shutdown_tx = supervisor.shutdown_sender();
    let signal_task = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received (Ctrl+C)");
                let _ = shutdown_tx.send(());
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let outcomes = supervisor.join().await;
    signal_task.abort();

    if outcomes.iter().any(|(_, outcome)| *outcome == TaskOutcome::Cancelled) {
        info!("Startup interrupted, exiting");
        return Ok(());
    }
    for (venue, outcome) in &outcomes {
        info!(venue = %venue, outcome = ?outcome, "Venue startup finished");
    }

    // =================================================================
    // 4. Snapshot Tickers
    // =================================================================

    for adapter in &enabled {
        for pair in adapter.enabled_pairs() {
            match adapter.fetch_ticker(&pair, AssetClass::Spot).await {
                Ok(ticker) => info!(
                    venue = %adapter.name(),
                    pair = %pair,
                    last = ticker.last,
                    bid = ticker.bid,
                    ask = ticker.ask,
                    volume = ticker.volume,
                    "Ticker"
                ),
                Err(e) => warn!(venue = %adapter.name(), pair = %pair, error = %e, "Ticker unavailable"),
            }
        }
    }

    info!("Gateway stopped");
    Ok(())
}
