//! State and helpers shared by every venue adapter
//!
//! `VenueBase` holds the venue identity, pair formats, the available and
//! enabled pair sets, the write-back collaborator and the cache handle
//! injected by the host.

use crate::cache::MarketDataCache;
use crate::config::{PairStore, VenueConfig};
use crate::currency::{CurrencyPair, PairFormat};
use crate::error::{AdapterError, Result};
use crate::traits::{AssetClass, Operation, VenueIdentity};
use crate::utils::{DispatcherConfig, RateLimiterConfig, DEFAULT_HTTP_TIMEOUT};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Venue-independent defaults an adapter declares at construction
#[derive(Clone, Debug)]
pub struct VenueDefaults {
    pub identity: VenueIdentity,
    /// Format of pair strings in configuration and the pair catalogue
    pub config_format: PairFormat,
    /// Format of pair strings sent to the venue
    pub request_format: PairFormat,
    pub verbose: bool,
}

#[derive(Clone, Debug, Default)]
struct PairSets {
    available: Vec<CurrencyPair>,
    enabled: Vec<CurrencyPair>,
}

pub struct VenueBase {
    identity: VenueIdentity,
    config_format: PairFormat,
    request_format: PairFormat,
    verbose: bool,
    pairs: RwLock<PairSets>,
    cache: Arc<MarketDataCache>,
    pair_store: Option<Arc<dyn PairStore>>,
}

impl VenueBase {
    pub fn new(defaults: VenueDefaults, cache: Arc<MarketDataCache>) -> Self {
        Self {
            identity: defaults.identity,
            config_format: defaults.config_format,
            request_format: defaults.request_format,
            verbose: defaults.verbose,
            pairs: RwLock::new(PairSets::default()),
            cache,
            pair_store: None,
        }
    }

    /// Applies user configuration on top of the venue defaults
    ///
    /// A venue disabled in configuration stays disabled and keeps no pairs.
    pub fn from_config(
        mut defaults: VenueDefaults,
        config: &VenueConfig,
        cache: Arc<MarketDataCache>,
        pair_store: Option<Arc<dyn PairStore>>,
    ) -> Result<Self> {
        if !config.enabled {
            defaults.identity.enabled = false;
            info!(venue = %defaults.identity.name, "Venue disabled by configuration");
            return Ok(Self::new(defaults, cache).with_pair_store(pair_store));
        }

        if let Some(format) = &config.config_pair_format {
            defaults.config_format = format.clone();
        }
        if let Some(auto) = config.auto_pair_updates {
            defaults.identity.features.enabled.auto_pair_updates = auto;
        }
        defaults.verbose = config.verbose;

        let enabled = VenueConfig::parse_pairs(&config.enabled_pairs, &defaults.config_format)?;
        let mut available = VenueConfig::parse_pairs(&config.available_pairs, &defaults.config_format)?;
        if available.is_empty() {
            available = enabled.clone();
        }

        let base = Self::new(defaults, cache).with_pair_store(pair_store);
        *base.pairs.write() = PairSets { available, enabled };
        Ok(base)
    }

    pub fn with_pair_store(mut self, store: Option<Arc<dyn PairStore>>) -> Self {
        self.pair_store = store;
        self
    }

    pub fn identity(&self) -> &VenueIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn is_enabled(&self) -> bool {
        self.identity.enabled
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn cache(&self) -> &MarketDataCache {
        &self.cache
    }

    pub fn config_format(&self) -> &PairFormat {
        &self.config_format
    }

    /// Pair string in the venue's request format
    pub fn request_symbol(&self, pair: &CurrencyPair) -> String {
        pair.format(&self.request_format)
    }

    pub fn enabled_pairs(&self) -> Vec<CurrencyPair> {
        self.pairs.read().enabled.clone()
    }

    pub fn available_pairs(&self) -> Vec<CurrencyPair> {
        self.pairs.read().available.clone()
    }

    pub fn set_enabled_pairs(&self, pairs: Vec<CurrencyPair>) {
        self.pairs.write().enabled = pairs;
    }

    /// Rejects asset classes the venue does not trade
    pub fn check_asset(&self, asset: AssetClass) -> Result<()> {
        if self.identity.supports_asset(asset) {
            Ok(())
        } else {
            Err(AdapterError::Validation(format!(
                "{} does not trade asset class {}",
                self.identity.name, asset
            )))
        }
    }

    pub fn unsupported(&self, operation: Operation) -> AdapterError {
        AdapterError::Unsupported {
            venue: self.identity.name.clone(),
            operation,
        }
    }

    pub fn not_yet_implemented(&self, operation: Operation) -> AdapterError {
        AdapterError::NotYetImplemented {
            venue: self.identity.name.clone(),
            operation,
        }
    }

    /// Replaces the pair set with a freshly fetched catalogue
    ///
    /// The list becomes both the available and the enabled set. It is written
    /// back only when it differs from the current enabled set or `force` is set,
    /// and the sets are swapped only once the write-back succeeded.
    /// Returns whether anything changed.
    pub fn update_pairs(&self, fetched: &[String], force: bool) -> Result<bool> {
        let parsed: Vec<CurrencyPair> = fetched
            .iter()
            .filter_map(|raw| match self.config_format.parse(raw) {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warn!(venue = %self.identity.name, pair = %raw, error = %e, "Skipping unparsable catalogue pair");
                    None
                }
            })
            .collect();

        let changed = {
            let current = self.pairs.read();
            current.enabled != parsed
        };

        if !changed && !force {
            debug!(venue = %self.identity.name, count = parsed.len(), "Tradable pairs unchanged");
            return Ok(false);
        }

        // Persist first; a failed write leaves the in-memory sets untouched so
        // the next refresh still sees the change and retries
        if let Some(store) = &self.pair_store {
            let rendered: Vec<String> = parsed.iter().map(|p| p.format(&self.config_format)).collect();
            store.store_pairs(&self.identity.name, &rendered)?;
        }

        {
            let mut sets = self.pairs.write();
            sets.available = parsed.clone();
            sets.enabled = parsed.clone();
        }

        info!(venue = %self.identity.name, count = parsed.len(), forced = force, "Tradable pairs updated");
        Ok(changed)
    }

    /// Logs the enabled pairs when the venue is verbose
    pub fn log_enabled_pairs(&self) {
        if !self.verbose {
            return;
        }
        let pairs = self.enabled_pairs();
        let listed: Vec<String> = pairs.iter().map(|p| p.format(&self.config_format)).collect();
        info!(venue = %self.identity.name, count = pairs.len(), pairs = %listed.join(","), "Currencies enabled");
    }
}

/// Dispatcher settings for a venue: its default quotas, then any configured overrides
pub fn dispatcher_config(
    config: &VenueConfig,
    authenticated: RateLimiterConfig,
    unauthenticated: RateLimiterConfig,
) -> Result<DispatcherConfig> {
    let mut dispatcher = DispatcherConfig {
        authenticated,
        unauthenticated,
        timeout: config
            .http_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT),
    };

    if let Some(overrides) = &config.rate_limits {
        overrides.validate(&config.name)?;
        if let Some(spec) = overrides.authenticated {
            dispatcher.authenticated = spec.into();
        }
        if let Some(spec) = overrides.unauthenticated {
            dispatcher.unauthenticated = spec.into();
        }
    }
    Ok(dispatcher)
}

/// Current Unix timestamp in milliseconds, 0 if the clock is unavailable
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            error!("System time error: {}", e);
            0
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryPairStore;
    use crate::traits::{EnabledFeatures, Features, SupportedFeatures, WithdrawPermissions};

    fn defaults() -> VenueDefaults {
        VenueDefaults {
            identity: VenueIdentity {
                name: "TestVenue".to_string(),
                enabled: true,
                asset_classes: vec![AssetClass::Spot],
                features: Features {
                    supports: SupportedFeatures {
                        auto_pair_updates: true,
                        rest: true,
                        ..Default::default()
                    },
                    enabled: EnabledFeatures { auto_pair_updates: true },
                },
                withdraw_permissions: WithdrawPermissions::NONE,
            },
            config_format: PairFormat::new("-", true),
            request_format: PairFormat::new("", false),
            verbose: false,
        }
    }

    #[test]
    fn test_from_config_applies_overrides() {
        let mut config = VenueConfig::new("TestVenue");
        config.enabled_pairs = vec!["BTC-USDT".into(), "eth-btc".into()];
        config.auto_pair_updates = Some(false);

        let base = VenueBase::from_config(defaults(), &config, Arc::new(MarketDataCache::new()), None).unwrap();
        assert_eq!(base.enabled_pairs().len(), 2);
        assert_eq!(base.available_pairs().len(), 2);
        assert!(!base.identity().features.enabled.auto_pair_updates);
        assert_eq!(base.request_symbol(&CurrencyPair::new("BTC", "USDT")), "btcusdt");
    }

    #[test]
    fn test_disabled_config_disables_venue() {
        let mut config = VenueConfig::new("TestVenue");
        config.enabled = false;
        config.enabled_pairs = vec!["BTC-USDT".into()];

        let base = VenueBase::from_config(defaults(), &config, Arc::new(MarketDataCache::new()), None).unwrap();
        assert!(!base.is_enabled());
        assert!(base.enabled_pairs().is_empty());
    }

    #[test]
    fn test_malformed_configured_pair_is_an_error() {
        let mut config = VenueConfig::new("TestVenue");
        config.enabled_pairs = vec!["BTCUSDT".into()];
        let result = VenueBase::from_config(defaults(), &config, Arc::new(MarketDataCache::new()), None);
        assert!(matches!(result, Err(AdapterError::Validation(_))));
    }

    #[test]
    fn test_update_pairs_writes_only_on_change_or_force() {
        let store = Arc::new(MemoryPairStore::new());
        let base = VenueBase::new(defaults(), Arc::new(MarketDataCache::new()))
            .with_pair_store(Some(store.clone() as Arc<dyn PairStore>));

        let fetched = vec!["BTC-USDT".to_string(), "ETH-BTC".to_string()];
        assert!(base.update_pairs(&fetched, false).unwrap());
        assert_eq!(store.writes(), 1);
        assert_eq!(store.pairs("TestVenue").unwrap(), fetched);

        assert!(!base.update_pairs(&fetched, false).unwrap());
        assert_eq!(store.writes(), 1);

        base.update_pairs(&fetched, true).unwrap();
        assert_eq!(store.writes(), 2);
        assert_eq!(base.enabled_pairs(), vec![CurrencyPair::new("BTC", "USDT"), CurrencyPair::new("ETH", "BTC")]);
    }

    /// Pair store whose first write fails
    #[derive(Default)]
    struct FailOnceStore {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl PairStore for FailOnceStore {
        fn store_pairs(&self, _venue: &str, _pairs: &[String]) -> Result<()> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == 0 {
                return Err(AdapterError::Config("config file not writable".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_back_is_retried_on_next_refresh() {
        let store = Arc::new(FailOnceStore::default());
        let mut config = VenueConfig::new("TestVenue");
        config.enabled_pairs = vec!["ETH-BTC".into()];
        let base = VenueBase::from_config(
            defaults(),
            &config,
            Arc::new(MarketDataCache::new()),
            Some(store.clone() as Arc<dyn PairStore>),
        )
        .unwrap();

        let fetched = vec!["BTC-USDT".to_string()];
        assert!(matches!(base.update_pairs(&fetched, false), Err(AdapterError::Config(_))));
        assert_eq!(base.enabled_pairs(), vec![CurrencyPair::new("ETH", "BTC")]);
        assert_eq!(base.available_pairs(), vec![CurrencyPair::new("ETH", "BTC")]);

        assert!(base.update_pairs(&fetched, false).unwrap());
        assert_eq!(store.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(base.enabled_pairs(), vec![CurrencyPair::new("BTC", "USDT")]);
    }

    #[test]
    fn test_dispatcher_config_overrides() {
        use crate::config::{LimitSpec, RateLimitOverrides};

        let mut config = VenueConfig::new("TestVenue");
        let defaults = dispatcher_config(&config, RateLimiterConfig::unlimited(), RateLimiterConfig::unlimited()).unwrap();
        assert_eq!(defaults.timeout, DEFAULT_HTTP_TIMEOUT);
        assert!(defaults.authenticated.is_unlimited());

        config.http_timeout_ms = Some(2_500);
        config.rate_limits = Some(RateLimitOverrides {
            authenticated: Some(LimitSpec { requests: 5, window_ms: 1_000 }),
            unauthenticated: None,
        });
        let tuned = dispatcher_config(&config, RateLimiterConfig::unlimited(), RateLimiterConfig::unlimited()).unwrap();
        assert_eq!(tuned.timeout, Duration::from_millis(2_500));
        assert_eq!(tuned.authenticated, RateLimiterConfig { requests_per_window: 5, window_ms: 1_000 });
        assert!(tuned.unauthenticated.is_unlimited());

        config.rate_limits = Some(RateLimitOverrides {
            authenticated: None,
            unauthenticated: Some(LimitSpec { requests: 5, window_ms: 0 }),
        });
        let zero_window = dispatcher_config(&config, RateLimiterConfig::unlimited(), RateLimiterConfig::unlimited());
        assert!(matches!(zero_window, Err(AdapterError::Config(_))));
    }

    #[test]
    fn test_check_asset() {
        let base = VenueBase::new(defaults(), Arc::new(MarketDataCache::new()));
        assert!(base.check_asset(AssetClass::Spot).is_ok());
        assert!(matches!(base.check_asset(AssetClass::Futures), Err(AdapterError::Validation(_))));
    }
}
