//! Gateway configuration
//!
//! Loaded from a TOML file with environment variable overrides for credentials.
//!
//! # Example
//!
//! ```toml
//! [[venues]]
//! name = "HuobiHadax"
//! enabled = true
//! verbose = true
//! enabled_pairs = ["BTC-USDT", "ETH-BTC"]
//!
//! [venues.config_pair_format]
//! delimiter = "-"
//! uppercase = true
//! ```
//!
//! `HUOBIHADAX_API_KEY`, `HUOBIHADAX_API_SECRET` and `HUOBIHADAX_CLIENT_ID`
//! override the file's credentials for that venue.

use crate::currency::{CurrencyPair, PairFormat};
use crate::error::{AdapterError, Result};
use crate::utils::RateLimiterConfig;
use anyhow::Context;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Default location of the gateway configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub venues: Vec<VenueConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Overrides the venue's default for automatic pair catalogue refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_pair_updates: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_ms: Option<u64>,

    /// Overrides the venue's default pair format for configured pair strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_pair_format: Option<PairFormat>,

    #[serde(default)]
    pub enabled_pairs: Vec<String>,

    #[serde(default)]
    pub available_pairs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limits: Option<RateLimitOverrides>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

fn default_enabled() -> bool {
    true
}

impl VenueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            verbose: false,
            auto_pair_updates: None,
            http_timeout_ms: None,
            config_pair_format: None,
            enabled_pairs: Vec::new(),
            available_pairs: Vec::new(),
            rate_limits: None,
            credentials: None,
        }
    }

    /// Environment variable prefix: the venue name uppercased, other characters as `_`
    pub fn env_prefix(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect()
    }

    /// Parses a list of configured pair strings with the given format
    pub fn parse_pairs(raw: &[String], format: &PairFormat) -> Result<Vec<CurrencyPair>> {
        raw.iter().map(|p| format.parse(p)).collect()
    }
}

/// Per-class bucket overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<LimitSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unauthenticated: Option<LimitSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSpec {
    pub requests: u32,
    pub window_ms: u64,
}

impl LimitSpec {
    /// A bounded bucket needs a non-empty window, otherwise every call opens a new one
    pub fn validate(&self, venue: &str, class: &str) -> Result<()> {
        if self.requests > 0 && self.window_ms == 0 {
            return Err(AdapterError::Config(format!(
                "{}: {} rate limit of {} requests needs window_ms > 0",
                venue, class, self.requests
            )));
        }
        Ok(())
    }
}

impl RateLimitOverrides {
    pub fn validate(&self, venue: &str) -> Result<()> {
        if let Some(spec) = &self.authenticated {
            spec.validate(venue, "authenticated")?;
        }
        if let Some(spec) = &self.unauthenticated {
            spec.validate(venue, "unauthenticated")?;
        }
        Ok(())
    }
}

impl From<LimitSpec> for RateLimiterConfig {
    fn from(spec: LimitSpec) -> Self {
        RateLimiterConfig {
            requests_per_window: spec.requests,
            window_ms: spec.window_ms,
        }
    }
}

/// Venue API credentials
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl GatewayConfig {
    /// Parses configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse gateway configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file without environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self =
            toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Rejects settings no adapter could run with
    pub fn validate(&self) -> Result<()> {
        for venue in &self.venues {
            if let Some(overrides) = &venue.rate_limits {
                overrides.validate(&venue.name)?;
            }
        }
        Ok(())
    }

    /// Loads configuration from a TOML file and applies environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Replaces credentials with `<PREFIX>_API_KEY`, `<PREFIX>_API_SECRET` and
    /// `<PREFIX>_CLIENT_ID` when present
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for venue in &mut self.venues {
            let prefix = venue.env_prefix();
            let key = lookup(&format!("{}_API_KEY", prefix));
            let secret = lookup(&format!("{}_API_SECRET", prefix));
            let client_id = lookup(&format!("{}_CLIENT_ID", prefix));

            if key.is_none() && secret.is_none() && client_id.is_none() {
                continue;
            }

            let creds = venue.credentials.get_or_insert_with(Credentials::default);
            if let Some(key) = key {
                creds.api_key = key;
            }
            if let Some(secret) = secret {
                creds.api_secret = secret;
            }
            if client_id.is_some() {
                creds.client_id = client_id;
            }
            info!(venue = %venue.name, "Credentials overridden from environment");
        }
    }

    pub fn venue(&self, name: &str) -> Option<&VenueConfig> {
        self.venues.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }
}

// ============================================================================
// Pair Store
// ============================================================================

/// Write-back collaborator for refreshed venue pair lists
pub trait PairStore: Send + Sync {
    fn store_pairs(&self, venue: &str, pairs: &[String]) -> Result<()>;
}

/// In-process pair store
#[derive(Default)]
pub struct MemoryPairStore {
    pairs: DashMap<String, Vec<String>>,
    writes: AtomicUsize,
}

impl MemoryPairStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pairs(&self, venue: &str) -> Option<Vec<String>> {
        self.pairs.get(&venue.to_lowercase()).map(|p| p.value().clone())
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PairStore for MemoryPairStore {
    fn store_pairs(&self, venue: &str, pairs: &[String]) -> Result<()> {
        self.pairs.insert(venue.to_lowercase(), pairs.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Rewrites the venue's pair lists in the TOML configuration file
pub struct ConfigFilePairStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ConfigFilePairStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl PairStore for ConfigFilePairStore {
    fn store_pairs(&self, venue: &str, pairs: &[String]) -> Result<()> {
        let _guard = self.lock.lock();

        // Re-read the file so environment-provided credentials are never written out
        let mut config = GatewayConfig::from_file(&self.path).map_err(|e| AdapterError::Config(format!("{:#}", e)))?;

        let Some(entry) = config.venues.iter_mut().find(|v| v.name.eq_ignore_ascii_case(venue)) else {
            warn!(venue, path = %self.path.display(), "Venue missing from config file, pairs not persisted");
            return Err(AdapterError::Config(format!("venue {} not present in {}", venue, self.path.display())));
        };
        entry.enabled_pairs = pairs.to_vec();
        entry.available_pairs = pairs.to_vec();

        let rendered = toml::to_string_pretty(&config)
            .map_err(|e| AdapterError::Config(format!("failed to render config: {}", e)))?;
        std::fs::write(&self.path, rendered)
            .map_err(|e| AdapterError::Config(format!("failed to write {}: {}", self.path.display(), e)))?;

        info!(venue, count = pairs.len(), path = %self.path.display(), "Persisted venue pairs");
        Ok(())
    }
}
