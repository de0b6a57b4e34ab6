//! Rate limiting for venue API requests
//!
//! Fixed-window token bucket: each window grants at most `requests_per_window`
//! tokens. Callers that find the bucket empty wait for the window to roll over
//! instead of failing, which gives natural backpressure under load.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

/// Configuration for one bucket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per window; 0 disables limiting
    pub requests_per_window: u32,

    /// Window length in milliseconds
    pub window_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 20,
            window_ms: 1000,
        }
    }
}

impl RateLimiterConfig {
    pub fn new(requests_per_window: u32, window: Duration) -> Self {
        Self {
            requests_per_window,
            window_ms: window.as_millis() as u64,
        }
    }

    /// Bucket for venues that publish no request limit
    pub fn unlimited() -> Self {
        Self {
            requests_per_window: 0,
            window_ms: 1000,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.requests_per_window == 0
    }
}

struct RateLimiterState {
    /// Tokens granted in the current window
    used: u32,

    /// Start of the current window
    window_start: Instant,

    config: RateLimiterConfig,
}

/// Blocking fixed-window rate limiter
///
/// Clones share the same bucket, so every caller holding a clone competes for
/// the same quota. Token acquisition is serialized by the inner mutex; the lock
/// is released while waiting for the next window.
pub struct RateLimiter {
    name: Arc<str>,
    state: Arc<Mutex<RateLimiterState>>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: RateLimiterConfig) -> Self {
        let state = RateLimiterState {
            used: 0,
            window_start: Instant::now(),
            config,
        };

        Self {
            name: Arc::from(name.into()),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquires a token, waiting for the next window when the quota is spent
    pub async fn acquire(&self) {
        loop {
            let mut state = self.state.lock().await;

            if state.config.is_unlimited() {
                return;
            }

            let window = Duration::from_millis(state.config.window_ms);
            let now = Instant::now();
            let elapsed = now.duration_since(state.window_start);

            if elapsed >= window {
                state.window_start = now;
                state.used = 0;
            }

            if state.used < state.config.requests_per_window {
                state.used += 1;
                debug!(
                    bucket = %self.name,
                    remaining = state.config.requests_per_window - state.used,
                    "Rate limiter token acquired"
                );
                return;
            }

            let wait = window.saturating_sub(now.duration_since(state.window_start));
            drop(state); // Release lock while sleeping

            debug!(bucket = %self.name, wait_ms = wait.as_millis() as u64, "Rate limit reached - waiting for next window");
            sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Tokens still available in the current window (`u32::MAX` when unlimited)
    pub async fn available_tokens(&self) -> u32 {
        let state = self.state.lock().await;
        if state.config.is_unlimited() {
            return u32::MAX;
        }
        if state.window_start.elapsed() >= Duration::from_millis(state.config.window_ms) {
            return state.config.requests_per_window;
        }
        state.config.requests_per_window - state.used
    }

    /// Resets the bucket to full capacity
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.used = 0;
        state.window_start = Instant::now();
        debug!(bucket = %self.name, "Rate limiter reset to full capacity");
    }

    pub async fn config(&self) -> RateLimiterConfig {
        self.state.lock().await.config.clone()
    }
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            state: Arc::clone(&self.state),
        }
    }
}
