//! itBit Authentication and REST Client
//!
//! Shared authentication, the REST binding trait used by the adapter, its
//! reqwest-backed implementation and the venue's response types.
//!
//! All decimals arrive string-encoded; they are kept as raw JSON values here and
//! converted (with zero substitution) by the adapter.

use crate::config::Credentials;
use crate::error::{AdapterError, Result, TransportError};
use crate::utils::{CredentialClass, RequestDispatcher};
use crate::venue::now_ms;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

// =============================================================================
// API Endpoints
// =============================================================================

/// itBit REST API base URL
pub const ITBIT_REST_URL: &str = "https://api.itbit.com/v1";

/// Venue name as reported by the adapter
pub const ITBIT_NAME: &str = "ITBIT";

// =============================================================================
// Authentication
// =============================================================================

#[derive(Clone)]
pub struct ItbitAuth {
    pub api_key: String,
    pub api_secret: String,
    /// itBit user id; wallet enumeration is scoped to it
    pub user_id: Option<String>,
}

impl ItbitAuth {
    pub fn new(api_key: String, api_secret: String, user_id: Option<String>) -> Self {
        Self {
            api_key,
            api_secret,
            user_id,
        }
    }

    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(
            credentials.api_key.clone(),
            credentials.api_secret.clone(),
            credentials.client_id.clone(),
        )
    }

    /// Generates the base64 HMAC-SHA512 request signature
    ///
    /// Message: `[verb, url, body, nonce, timestamp]` as a JSON array, hashed with
    /// SHA256 after the nonce, then signed together with the URL.
    pub fn sign_request(&self, method: &str, url: &str, body: &str, nonce: u64, timestamp: u64) -> String {
        use base64::engine::general_purpose;
        use base64::Engine;
        use hmac::{Hmac, Mac};
        use sha2::{Digest, Sha256, Sha512};

        let message = serde_json::json!([method, url, body, nonce.to_string(), timestamp.to_string()]).to_string();

        let mut sha256 = Sha256::new();
        sha256.update(format!("{}{}", nonce, message));
        let digest = sha256.finalize();

        let mut payload = url.as_bytes().to_vec();
        payload.extend_from_slice(&digest);

        // HMAC-SHA512 accepts keys of any size, this should never fail
        let mut mac = match Hmac::<Sha512>::new_from_slice(self.api_secret.as_bytes()) {
            Ok(m) => m,
            Err(e) => {
                error!("HMAC initialization failed: {}", e);
                return String::new();
            }
        };
        mac.update(&payload);

        general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItbitTicker {
    #[serde(default)]
    pub pair: String,
    #[serde(default)]
    pub bid: Value,
    #[serde(default)]
    pub ask: Value,
    #[serde(default)]
    pub last_price: Value,
    #[serde(default)]
    pub high24h: Value,
    #[serde(default)]
    pub low24h: Value,
    #[serde(default)]
    pub volume24h: Value,
    #[serde(default, rename = "serverTimeUTC")]
    pub server_time_utc: Option<String>,
}

/// Depth as `[price, amount]` string pairs, best level first
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItbitOrderBook {
    #[serde(default)]
    pub bids: Vec<Vec<Value>>,
    #[serde(default)]
    pub asks: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItbitWallet {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub balances: Vec<ItbitBalance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItbitBalance {
    pub currency: String,
    #[serde(default)]
    pub available_balance: Value,
    #[serde(default)]
    pub total_balance: Value,
}

/// New order body for `POST /wallets/{walletId}/orders`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItbitOrderRequest {
    pub side: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Base currency of the instrument
    pub currency: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub instrument: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_identifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItbitOrder {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub wallet_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub instrument: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub amount_filled: Value,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub client_order_identifier: Option<String>,
}

impl ItbitOrder {
    pub fn is_rejected(&self) -> bool {
        self.status.eq_ignore_ascii_case("rejected")
    }
}

// =============================================================================
// REST Binding
// =============================================================================

/// The itBit endpoints the adapter consumes
///
/// Implemented over HTTP by [`ItbitRestClient`]; tests substitute in-memory bindings.
#[async_trait]
pub trait ItbitApi: Send + Sync {
    async fn get_ticker(&self, symbol: &str) -> Result<ItbitTicker>;
    async fn get_orderbook(&self, symbol: &str) -> Result<ItbitOrderBook>;
    async fn get_wallets(&self) -> Result<Vec<ItbitWallet>>;
    async fn place_order(&self, wallet_id: &str, order: &ItbitOrderRequest) -> Result<ItbitOrder>;
    async fn cancel_order(&self, wallet_id: &str, order_id: &str) -> Result<()>;
}

/// HTTP client for the itBit REST API
#[derive(Clone)]
pub struct ItbitRestClient {
    dispatcher: RequestDispatcher,
    auth: Option<ItbitAuth>,
    base_url: String,
    nonce: Arc<AtomicU64>,
}

impl ItbitRestClient {
    pub fn new(dispatcher: RequestDispatcher, auth: Option<ItbitAuth>) -> Self {
        Self {
            dispatcher,
            auth,
            base_url: ITBIT_REST_URL.to_string(),
            nonce: Arc::new(AtomicU64::new(now_ms())),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    fn auth(&self) -> Result<&ItbitAuth> {
        self.auth
            .as_ref()
            .ok_or_else(|| AdapterError::Config(format!("{}: API credentials required", ITBIT_NAME)))
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.dispatcher.http().get(&url);
        self.dispatcher.send(CredentialClass::Unauthenticated, request).await
    }

    /// Builds a signed request; the nonce strictly increases per client
    fn signed(&self, method: Method, path: &str, body: Option<String>) -> Result<RequestBuilder> {
        let auth = self.auth()?;
        let url = format!("{}{}", self.base_url, path);
        let body = body.unwrap_or_default();
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let timestamp = now_ms();
        let signature = auth.sign_request(method.as_str(), &url, &body, nonce, timestamp);

        let mut request = self
            .dispatcher
            .http()
            .request(method, &url)
            .header("Authorization", format!("{}:{}", auth.api_key, signature))
            .header("X-Auth-Timestamp", timestamp.to_string())
            .header("X-Auth-Nonce", nonce.to_string())
            .header("Content-Type", "application/json");
        if !body.is_empty() {
            request = request.body(body);
        }
        Ok(request)
    }
}

#[async_trait]
impl ItbitApi for ItbitRestClient {
    async fn get_ticker(&self, symbol: &str) -> Result<ItbitTicker> {
        self.get_public(&format!("/markets/{}/ticker", symbol)).await
    }

    async fn get_orderbook(&self, symbol: &str) -> Result<ItbitOrderBook> {
        self.get_public(&format!("/markets/{}/order_book", symbol)).await
    }

    async fn get_wallets(&self) -> Result<Vec<ItbitWallet>> {
        let user_id = self
            .auth()?
            .user_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AdapterError::Config(format!("{}: client id (user id) required", ITBIT_NAME)))?;

        let query = serde_urlencoded::to_string(&[("userId", user_id.as_str())])
            .map_err(|e| AdapterError::transport(ITBIT_NAME, TransportError::Request(e.to_string())))?;
        let request = self.signed(Method::GET, &format!("/wallets?{}", query), None)?;
        self.dispatcher.send(CredentialClass::Authenticated, request).await
    }

    async fn place_order(&self, wallet_id: &str, order: &ItbitOrderRequest) -> Result<ItbitOrder> {
        let body = serde_json::to_string(order)
            .map_err(|e| AdapterError::transport(ITBIT_NAME, TransportError::Request(e.to_string())))?;
        debug!(venue = ITBIT_NAME, wallet = %wallet_id, instrument = %order.instrument, "Placing order");

        let request = self.signed(Method::POST, &format!("/wallets/{}/orders", wallet_id), Some(body))?;
        self.dispatcher.send(CredentialClass::Authenticated, request).await
    }

    async fn cancel_order(&self, wallet_id: &str, order_id: &str) -> Result<()> {
        let request = self.signed(Method::DELETE, &format!("/wallets/{}/orders/{}", wallet_id, order_id), None)?;
        self.dispatcher.send_raw(CredentialClass::Authenticated, request).await?;
        Ok(())
    }
}
