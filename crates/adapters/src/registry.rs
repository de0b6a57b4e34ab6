//! Builds venue adapters from configuration
//!
//! The registry owns the process-wide market data cache and hands it, together
//! with the pair store, to every adapter it constructs.

use crate::cache::MarketDataCache;
use crate::config::{GatewayConfig, PairStore, VenueConfig};
use crate::error::{AdapterError, Result};
use crate::hadax::HadaxSpotAdapter;
use crate::itbit::ItbitSpotAdapter;
use crate::traits::VenueAdapter;
use std::sync::Arc;
use tracing::info;

/// Venue names the registry can build
pub const KNOWN_VENUES: [&str; 2] = ["ITBIT", "HuobiHadax"];

pub struct VenueRegistry {
    cache: Arc<MarketDataCache>,
    adapters: Vec<Arc<dyn VenueAdapter>>,
}

impl VenueRegistry {
    pub fn new(cache: Arc<MarketDataCache>) -> Self {
        Self {
            cache,
            adapters: Vec::new(),
        }
    }

    /// Builds one adapter per configured venue
    pub fn from_config(
        config: &GatewayConfig,
        cache: Arc<MarketDataCache>,
        pair_store: Option<Arc<dyn PairStore>>,
    ) -> Result<Self> {
        let mut registry = Self::new(cache);
        for venue in &config.venues {
            let adapter = build_adapter(venue, registry.cache.clone(), pair_store.clone())?;
            registry.register(adapter);
        }
        Ok(registry)
    }

    pub fn register(&mut self, adapter: Arc<dyn VenueAdapter>) {
        info!(
            venue = %adapter.name(),
            enabled = adapter.identity().enabled,
            pairs = adapter.enabled_pairs().len(),
            "Registered venue"
        );
        self.adapters.push(adapter);
    }

    pub fn cache(&self) -> &Arc<MarketDataCache> {
        &self.cache
    }

    /// Looks a venue up by name, case-insensitively
    pub fn get(&self, name: &str) -> Option<Arc<dyn VenueAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn adapters(&self) -> &[Arc<dyn VenueAdapter>] {
        &self.adapters
    }

    pub fn enabled(&self) -> Vec<Arc<dyn VenueAdapter>> {
        self.adapters
            .iter()
            .filter(|a| a.identity().enabled)
            .cloned()
            .collect()
    }
}

/// Constructs the HTTP-backed adapter for one venue entry
pub fn build_adapter(
    config: &VenueConfig,
    cache: Arc<MarketDataCache>,
    pair_store: Option<Arc<dyn PairStore>>,
) -> Result<Arc<dyn VenueAdapter>> {
    let name = config.name.to_ascii_lowercase();
    match name.as_str() {
        "itbit" => Ok(Arc::new(ItbitSpotAdapter::from_config(config, cache, pair_store)?)),
        "huobihadax" | "hadax" => Ok(Arc::new(HadaxSpotAdapter::from_config(config, cache, pair_store)?)),
        _ => Err(AdapterError::Config(format!(
            "unknown venue '{}', expected one of {:?}",
            config.name, KNOWN_VENUES
        ))),
    }
}
