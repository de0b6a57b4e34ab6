use crate::cache::MarketDataCache;
use crate::currency::CurrencyPair;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Price = f64;
pub type Quantity = f64;
pub type UnixMillis = u64;

// ============================================================================
// Venue Identity & Capabilities
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Spot,
    Margin,
    Futures,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Spot => write!(f, "spot"),
            AssetClass::Margin => write!(f, "margin"),
            AssetClass::Futures => write!(f, "futures"),
        }
    }
}

/// Features a venue's API offers at all
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SupportedFeatures {
    pub auto_pair_updates: bool,
    pub rest_ticker_batching: bool,
    pub rest: bool,
    pub websocket: bool,
}

/// Features switched on for this process
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnabledFeatures {
    pub auto_pair_updates: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Features {
    pub supports: SupportedFeatures,
    pub enabled: EnabledFeatures,
}

impl Features {
    /// Pair catalogue refresh runs only when the venue supports it and it is enabled
    pub fn auto_pair_updates_active(&self) -> bool {
        self.supports.auto_pair_updates && self.enabled.auto_pair_updates
    }
}

/// Withdrawal methods permitted by a venue, as bit flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WithdrawPermissions(u32);

impl WithdrawPermissions {
    pub const NONE: Self = Self(0);
    pub const AUTO_WITHDRAW_CRYPTO: Self = Self(1);
    pub const AUTO_WITHDRAW_CRYPTO_WITH_API_PERMISSION: Self = Self(1 << 1);
    pub const AUTO_WITHDRAW_CRYPTO_WITH_SETUP: Self = Self(1 << 2);
    pub const WITHDRAW_CRYPTO_WITH_2FA: Self = Self(1 << 3);
    pub const WITHDRAW_CRYPTO_VIA_WEBSITE_ONLY: Self = Self(1 << 4);
    pub const AUTO_WITHDRAW_FIAT: Self = Self(1 << 5);
    pub const WITHDRAW_FIAT_VIA_WEBSITE_ONLY: Self = Self(1 << 6);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Static description of a venue, fixed at adapter construction
#[derive(Clone, Debug)]
pub struct VenueIdentity {
    pub name: String,
    pub enabled: bool,
    pub asset_classes: Vec<AssetClass>,
    pub features: Features,
    pub withdraw_permissions: WithdrawPermissions,
}

impl VenueIdentity {
    pub fn supports_asset(&self, asset: AssetClass) -> bool {
        self.asset_classes.contains(&asset)
    }
}

/// Every operation of the adapter contract, used to label capability errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchTradablePairs,
    UpdateTradablePairs,
    UpdateTicker,
    FetchTicker,
    UpdateOrderbook,
    FetchOrderbook,
    GetAccountInfo,
    GetFundingHistory,
    GetExchangeHistory,
    SubmitOrder,
    ModifyOrder,
    CancelOrder,
    CancelAllOrders,
    GetOrderInfo,
    GetDepositAddress,
    WithdrawCrypto,
    WithdrawFiat,
    WithdrawFiatToBank,
    GetFeeByType,
    GetWithdrawCapabilities,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// Market Data
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct TickerSnapshot {
    pub venue: String,
    pub pair: CurrencyPair,
    pub asset_class: AssetClass,
    pub last: Price,
    pub high: Price,
    pub low: Price,
    pub bid: Price,
    pub ask: Price,
    pub volume: Quantity,
    pub updated_ms: UnixMillis,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrderBookLevel {
    pub price: Price,
    pub amount: Quantity,
}

/// Full depth snapshot; bids best-first (descending), asks best-first (ascending)
/// as delivered by the venue
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBookSnapshot {
    pub venue: String,
    pub pair: CurrencyPair,
    pub asset_class: AssetClass,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub updated_ms: UnixMillis,
}

// ============================================================================
// Account
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Balance {
    pub currency: String,
    pub available: Quantity,
    pub total: Quantity,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: String,
    pub balances: Vec<Balance>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountInfo {
    pub venue: String,
    pub accounts: Vec<Account>,
}

#[derive(Clone, Debug)]
pub struct FundHistory {
    pub currency: String,
    pub amount: Quantity,
    pub fee: f64,
    pub transfer_type: String,
    pub status: String,
    pub ts_ms: UnixMillis,
}

#[derive(Clone, Debug)]
pub struct TradeHistory {
    pub trade_id: String,
    pub price: Price,
    pub amount: Quantity,
    pub side: Side,
    pub ts_ms: UnixMillis,
}

// ============================================================================
// Orders & Trading
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
    Bid,
    Ask,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderKind {
    Limit,
    Market,
    StopLoss,
    StopLossLimit,
    TakeProfit,
    TakeProfitLimit,
}

/// Generic submission intent, independent of any venue
#[derive(Clone, Debug)]
pub struct OrderIntent {
    pub pair: CurrencyPair,
    pub side: Side,
    pub kind: OrderKind,
    pub amount: Quantity,
    pub price: Price,
    /// Caller reference; some venues reinterpret it (e.g. as an account id)
    pub client_ref: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitOrderResponse {
    pub order_id: String,
    /// Authoritative acceptance flag; a non-empty `order_id` alone proves nothing
    pub placed: bool,
}

#[derive(Clone, Debug, Default)]
pub struct OrderCancellation {
    pub order_id: String,
    /// Wallet scope for venues that cancel per wallet
    pub wallet_address: Option<String>,
    pub pair: Option<CurrencyPair>,
}

#[derive(Clone, Debug, Default)]
pub struct ModifyOrder {
    pub price: Option<Price>,
    pub amount: Option<Quantity>,
    pub to_market: bool,
}

#[derive(Clone, Debug)]
pub struct OrderDetail {
    pub order_id: String,
    pub pair: CurrencyPair,
    pub side: Side,
    pub kind: OrderKind,
    pub amount: Quantity,
    pub price: Price,
    pub filled: Quantity,
}

// ============================================================================
// Fees
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeeType {
    CryptocurrencyTradeFee,
    CryptocurrencyWithdrawalFee,
    CryptocurrencyDepositFee,
    InternationalBankDepositFee,
    InternationalBankWithdrawalFee,
}

#[derive(Clone, Debug)]
pub struct FeeBuilder {
    pub fee_type: FeeType,
    pub pair: CurrencyPair,
    pub purchase_price: Price,
    pub amount: Quantity,
    pub is_maker: bool,
}

// ============================================================================
// Adapter Contract
// ============================================================================

/// Capability-gated contract every venue adapter implements
///
/// An operation a venue cannot perform returns [`crate::AdapterError::Unsupported`];
/// one whose binding is unfinished returns [`crate::AdapterError::NotYetImplemented`].
/// Neither is ever replaced by an empty success.
#[async_trait::async_trait]
pub trait VenueAdapter: Send + Sync {
    fn identity(&self) -> &VenueIdentity;
    fn cache(&self) -> &MarketDataCache;
    fn enabled_pairs(&self) -> Vec<CurrencyPair>;

    fn name(&self) -> &str {
        &self.identity().name
    }

    /// Startup work (pair catalogue refresh); failures are logged, not raised
    async fn run(&self);

    // Pair catalogue
    async fn fetch_tradable_pairs(&self) -> Result<Vec<String>>;
    async fn update_tradable_pairs(&self, force: bool) -> Result<()>;

    // Market data
    async fn update_ticker(&self, pair: &CurrencyPair, asset: AssetClass) -> Result<TickerSnapshot>;
    async fn update_orderbook(&self, pair: &CurrencyPair, asset: AssetClass) -> Result<OrderBookSnapshot>;

    /// Cached ticker, refreshing once on a miss
    async fn fetch_ticker(&self, pair: &CurrencyPair, asset: AssetClass) -> Result<TickerSnapshot> {
        if let Some(ticker) = self.cache().ticker(self.name(), pair, asset) {
            return Ok(ticker);
        }
        self.update_ticker(pair, asset).await
    }

    /// Cached order book, refreshing once on a miss
    async fn fetch_orderbook(&self, pair: &CurrencyPair, asset: AssetClass) -> Result<OrderBookSnapshot> {
        if let Some(book) = self.cache().orderbook(self.name(), pair, asset) {
            return Ok(book);
        }
        self.update_orderbook(pair, asset).await
    }

    // Account
    async fn get_account_info(&self) -> Result<AccountInfo>;
    async fn get_funding_history(&self) -> Result<Vec<FundHistory>>;
    async fn get_exchange_history(&self, pair: &CurrencyPair, asset: AssetClass) -> Result<Vec<TradeHistory>>;

    // Order management
    async fn submit_order(&self, intent: &OrderIntent) -> Result<SubmitOrderResponse>;
    async fn modify_order(&self, order_id: i64, action: &ModifyOrder) -> Result<i64>;
    async fn cancel_order(&self, cancel: &OrderCancellation) -> Result<()>;
    async fn cancel_all_orders(&self) -> Result<()>;
    async fn get_order_info(&self, order_id: i64) -> Result<OrderDetail>;

    // Funding
    async fn get_deposit_address(&self, currency: &str) -> Result<String>;
    async fn withdraw_crypto(&self, address: &str, currency: &str, amount: Quantity) -> Result<String>;
    async fn withdraw_fiat(&self, currency: &str, amount: Quantity) -> Result<String>;
    async fn withdraw_fiat_to_bank(&self, currency: &str, amount: Quantity) -> Result<String>;

    // Fees & permissions
    async fn get_fee_by_type(&self, fee: &FeeBuilder) -> Result<f64>;
    fn get_withdraw_capabilities(&self) -> WithdrawPermissions;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdraw_permission_flags() {
        let perms = WithdrawPermissions::WITHDRAW_CRYPTO_VIA_WEBSITE_ONLY
            .union(WithdrawPermissions::WITHDRAW_FIAT_VIA_WEBSITE_ONLY);
        assert!(perms.contains(WithdrawPermissions::WITHDRAW_FIAT_VIA_WEBSITE_ONLY));
        assert!(!perms.contains(WithdrawPermissions::AUTO_WITHDRAW_CRYPTO));
        assert_eq!(WithdrawPermissions::NONE.bits(), 0);
    }

    #[test]
    fn test_auto_pair_updates_need_support_and_enablement() {
        let mut features = Features::default();
        features.enabled.auto_pair_updates = true;
        assert!(!features.auto_pair_updates_active());

        features.supports.auto_pair_updates = true;
        assert!(features.auto_pair_updates_active());

        features.enabled.auto_pair_updates = false;
        assert!(!features.auto_pair_updates_active());
    }
}
