//! Huobi Hadax Authentication and REST Client
//!
//! Every response is wrapped in an envelope:
//! `{"status": "ok" | "error", "err-code", "err-msg", "data" | "tick"}`.
//! An `error` status becomes [`AdapterError::Rejected`]; HTTP-level failures stay
//! transport errors.

use crate::config::Credentials;
use crate::error::{AdapterError, Result, TransportError};
use crate::utils::{CredentialClass, RequestDispatcher};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

// =============================================================================
// API Endpoints
// =============================================================================

/// Huobi Hadax REST API base URL
pub const HADAX_REST_URL: &str = "https://api.hadax.com";

/// Venue name as reported by the adapter
pub const HADAX_NAME: &str = "HuobiHadax";

/// Depth aggregation used for order-book refreshes
pub const DEPTH_STEP: &str = "step1";

// =============================================================================
// Authentication
// =============================================================================

#[derive(Clone)]
pub struct HadaxAuth {
    pub api_key: String,
    pub api_secret: String,
}

impl HadaxAuth {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self { api_key, api_secret }
    }

    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(credentials.api_key.clone(), credentials.api_secret.clone())
    }

    /// UTC timestamp in the `YYYY-MM-DDThh:mm:ss` form the venue expects
    pub fn timestamp() -> String {
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// Signature parameters for a request, sorted by key
    pub fn signature_params(&self, timestamp: &str) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("AccessKeyId".to_string(), self.api_key.clone());
        params.insert("SignatureMethod".to_string(), "HmacSHA256".to_string());
        params.insert("SignatureVersion".to_string(), "2".to_string());
        params.insert("Timestamp".to_string(), timestamp.to_string());
        params
    }

    /// Generates the base64 HMAC-SHA256 signature over `METHOD\nhost\npath\nquery`
    pub fn sign_request(&self, method: &str, host: &str, path: &str, query: &str) -> String {
        use base64::engine::general_purpose;
        use base64::Engine;
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let payload = format!("{}\n{}\n{}\n{}", method.to_uppercase(), host.to_lowercase(), path, query);

        // HMAC-SHA256 accepts keys of any size, this should never fail
        let mut mac = match Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes()) {
            Ok(m) => m,
            Err(e) => {
                error!("HMAC initialization failed: {}", e);
                return String::new();
            }
        };
        mac.update(payload.as_bytes());

        general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct HadaxEnvelope<T> {
    pub status: String,
    #[serde(rename = "err-code")]
    pub err_code: Option<String>,
    #[serde(rename = "err-msg")]
    pub err_msg: Option<String>,
    pub data: Option<T>,
    pub tick: Option<T>,
}

impl<T> HadaxEnvelope<T> {
    /// Unwraps the payload, turning an `error` status into a venue rejection
    pub fn into_result(self) -> Result<T> {
        if !self.status.eq_ignore_ascii_case("ok") {
            let reason = format!(
                "{}: {}",
                self.err_code.unwrap_or_else(|| self.status.clone()),
                self.err_msg.unwrap_or_default()
            );
            warn!(venue = HADAX_NAME, reason = %reason, "Venue returned error status");
            return Err(AdapterError::rejected(HADAX_NAME, reason));
        }

        self.data.or(self.tick).ok_or_else(|| {
            AdapterError::transport(
                HADAX_NAME,
                TransportError::Decode("response carries neither data nor tick".to_string()),
            )
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HadaxSymbol {
    pub base_currency: String,
    pub quote_currency: String,
    #[serde(default)]
    pub price_precision: u32,
    #[serde(default)]
    pub amount_precision: u32,
    #[serde(default)]
    pub symbol_partition: String,
}

impl HadaxSymbol {
    /// Catalogue entry in the configured pair format (`BASE-QUOTE`)
    pub fn pair_string(&self) -> String {
        format!("{}-{}", self.base_currency, self.quote_currency).to_uppercase()
    }
}

/// Merged 24h detail plus best bid/ask (`[price, size]`, possibly absent)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HadaxDetailMerged {
    #[serde(default)]
    pub close: f64,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub vol: f64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub bid: Vec<f64>,
    #[serde(default)]
    pub ask: Vec<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HadaxDepth {
    #[serde(default)]
    pub bids: Vec<Vec<Value>>,
    #[serde(default)]
    pub asks: Vec<Vec<Value>>,
    #[serde(default)]
    pub ts: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HadaxAccount {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HadaxBalanceSheet {
    pub id: i64,
    #[serde(default)]
    pub list: Vec<HadaxBalanceEntry>,
}

/// One balance line; `type` is `trade` (available) or `frozen`
#[derive(Debug, Clone, Deserialize)]
pub struct HadaxBalanceEntry {
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub balance: Value,
}

/// New order body for `POST /v1/hadax/order/orders/place`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HadaxOrderParams {
    pub account_id: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub source: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Order ids come back as JSON strings or numbers
pub fn order_id_from(value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        AdapterError::transport(
            HADAX_NAME,
            TransportError::Decode(format!("unexpected order id {}", value)),
        )
    })
}

// =============================================================================
// REST Binding
// =============================================================================

/// The Hadax endpoints the adapter consumes
#[async_trait]
pub trait HadaxApi: Send + Sync {
    async fn get_symbols(&self) -> Result<Vec<HadaxSymbol>>;
    async fn get_market_detail_merged(&self, symbol: &str) -> Result<HadaxDetailMerged>;
    async fn get_depth(&self, symbol: &str, step: &str) -> Result<HadaxDepth>;
    async fn place_order(&self, params: &HadaxOrderParams) -> Result<i64>;
    async fn cancel_order(&self, order_id: i64) -> Result<i64>;
    async fn get_accounts(&self) -> Result<Vec<HadaxAccount>>;
    async fn get_balance(&self, account_id: i64) -> Result<HadaxBalanceSheet>;
}

/// HTTP client for the Huobi Hadax REST API
#[derive(Clone)]
pub struct HadaxRestClient {
    dispatcher: RequestDispatcher,
    auth: Option<HadaxAuth>,
    base_url: String,
}

impl HadaxRestClient {
    pub fn new(dispatcher: RequestDispatcher, auth: Option<HadaxAuth>) -> Self {
        Self {
            dispatcher,
            auth,
            base_url: HADAX_REST_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    fn auth(&self) -> Result<&HadaxAuth> {
        self.auth
            .as_ref()
            .ok_or_else(|| AdapterError::Config(format!("{}: API credentials required", HADAX_NAME)))
    }

    fn host(&self) -> Result<String> {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .ok_or_else(|| AdapterError::Config(format!("{}: invalid base URL {}", HADAX_NAME, self.base_url)))
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.dispatcher.http().get(&url).query(params);
        let envelope: HadaxEnvelope<T> = self.dispatcher.send(CredentialClass::Unauthenticated, request).await?;
        envelope.into_result()
    }

    /// Signed request; `extra` query parameters are included in the signature
    async fn private<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        extra: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<T> {
        let auth = self.auth()?;
        let mut params = auth.signature_params(&HadaxAuth::timestamp());
        for (key, value) in extra {
            params.insert(key.to_string(), value.to_string());
        }

        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| AdapterError::transport(HADAX_NAME, TransportError::Request(e.to_string())))?;
        let signature = auth.sign_request(method.as_str(), &self.host()?, path, &query);
        let signed = serde_urlencoded::to_string(&[("Signature", signature.as_str())])
            .map_err(|e| AdapterError::transport(HADAX_NAME, TransportError::Request(e.to_string())))?;

        let url = format!("{}{}?{}&{}", self.base_url, path, query, signed);
        let mut request = self.dispatcher.http().request(method, &url);
        if let Some(body) = body {
            request = request.header("Content-Type", "application/json").body(body);
        }

        let envelope: HadaxEnvelope<T> = self.dispatcher.send(CredentialClass::Authenticated, request).await?;
        envelope.into_result()
    }
}

#[async_trait]
impl HadaxApi for HadaxRestClient {
    async fn get_symbols(&self) -> Result<Vec<HadaxSymbol>> {
        self.get_public("/v1/hadax/common/symbols", &[]).await
    }

    async fn get_market_detail_merged(&self, symbol: &str) -> Result<HadaxDetailMerged> {
        self.get_public("/market/detail/merged", &[("symbol", symbol)]).await
    }

    async fn get_depth(&self, symbol: &str, step: &str) -> Result<HadaxDepth> {
        self.get_public("/market/depth", &[("symbol", symbol), ("type", step)]).await
    }

    async fn place_order(&self, params: &HadaxOrderParams) -> Result<i64> {
        let body = serde_json::to_string(params)
            .map_err(|e| AdapterError::transport(HADAX_NAME, TransportError::Request(e.to_string())))?;
        debug!(venue = HADAX_NAME, symbol = %params.symbol, kind = %params.kind, "Placing order");

        let data: Value = self
            .private(reqwest::Method::POST, "/v1/hadax/order/orders/place", &[], Some(body))
            .await?;
        order_id_from(&data)
    }

    async fn cancel_order(&self, order_id: i64) -> Result<i64> {
        let path = format!("/v1/order/orders/{}/submitcancel", order_id);
        let data: Value = self
            .private(reqwest::Method::POST, &path, &[], Some("{}".to_string()))
            .await?;
        order_id_from(&data)
    }

    async fn get_accounts(&self) -> Result<Vec<HadaxAccount>> {
        self.private(reqwest::Method::GET, "/v1/account/accounts", &[], None).await
    }

    async fn get_balance(&self, account_id: i64) -> Result<HadaxBalanceSheet> {
        let path = format!("/v1/hadax/account/accounts/{}/balance", account_id);
        self.private(reqwest::Method::GET, &path, &[], None).await
    }
}
