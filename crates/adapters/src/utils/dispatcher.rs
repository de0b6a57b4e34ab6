//! Rate-limited request dispatcher
//!
//! One dispatcher per venue. It owns the venue's HTTP transport (fixed request
//! timeout, pooled connections) and two independent buckets, one per credential
//! class. Every request takes a token from the matching bucket before it is sent.
//!
//! Failures are surfaced as [`AdapterError::Transport`] and never retried here.

use crate::error::{AdapterError, Result, TransportError};
use crate::utils::rate_limiter::{RateLimiter, RateLimiterConfig};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout for venue REST calls
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Which quota a request is charged against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialClass {
    Authenticated,
    Unauthenticated,
}

impl fmt::Display for CredentialClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialClass::Authenticated => write!(f, "auth"),
            CredentialClass::Unauthenticated => write!(f, "unauth"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub authenticated: RateLimiterConfig,
    pub unauthenticated: RateLimiterConfig,
    pub timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            authenticated: RateLimiterConfig::default(),
            unauthenticated: RateLimiterConfig::default(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Shared transport plus dual-bucket rate limiting for one venue
///
/// Cloning is cheap: clones share the HTTP connection pool and both buckets.
#[derive(Clone)]
pub struct RequestDispatcher {
    venue: String,
    client: Client,
    authenticated: RateLimiter,
    unauthenticated: RateLimiter,
}

impl RequestDispatcher {
    pub fn new(venue: impl Into<String>, config: DispatcherConfig) -> Result<Self> {
        let venue = venue.into();
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| AdapterError::Config(format!("{}: failed to build HTTP client: {}", venue, e)))?;

        Ok(Self {
            authenticated: RateLimiter::new(format!("{}:{}", venue, CredentialClass::Authenticated), config.authenticated),
            unauthenticated: RateLimiter::new(
                format!("{}:{}", venue, CredentialClass::Unauthenticated),
                config.unauthenticated,
            ),
            venue,
            client,
        })
    }

    pub fn venue(&self) -> &str {
        &self.venue
    }

    /// Underlying HTTP client, for building requests
    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn limiter(&self, class: CredentialClass) -> &RateLimiter {
        match class {
            CredentialClass::Authenticated => &self.authenticated,
            CredentialClass::Unauthenticated => &self.unauthenticated,
        }
    }

    /// Sends a request once, after taking a token, and decodes a JSON body
    pub async fn send<T: DeserializeOwned>(&self, class: CredentialClass, request: RequestBuilder) -> Result<T> {
        let body = self.send_raw(class, request).await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(venue = %self.venue, error = %e, "Undecodable response body");
            AdapterError::transport(&self.venue, TransportError::Decode(e.to_string()))
        })
    }

    /// Sends a request once, after taking a token, and returns the body text
    pub async fn send_raw(&self, class: CredentialClass, request: RequestBuilder) -> Result<String> {
        self.limiter(class).acquire().await;

        let request = request
            .build()
            .map_err(|e| AdapterError::transport(&self.venue, TransportError::Request(e.to_string())))?;
        debug!(venue = %self.venue, class = %class, method = %request.method(), url = %request.url(), "Dispatching request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| AdapterError::transport(&self.venue, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::transport(&self.venue, e))?;

        if !status.is_success() {
            warn!(venue = %self.venue, status = status.as_u16(), "Venue returned non-success status");
            return Err(AdapterError::transport(
                &self.venue,
                TransportError::Status {
                    code: status.as_u16(),
                    body,
                },
            ));
        }

        Ok(body)
    }
}
