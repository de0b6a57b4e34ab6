//! Huobi Hadax Spot Market Adapter
//!
//! Implements [`VenueAdapter`] on top of a [`HadaxApi`] binding.
//!
//! The order's client reference carries the Hadax account id the order is placed
//! from. It is parsed before anything is sent; `0x`, `0o` and `0b` prefixes are
//! accepted.

use crate::cache::MarketDataCache;
use crate::config::{PairStore, VenueConfig};
use crate::currency::{CurrencyPair, PairFormat};
use crate::error::{AdapterError, Result};
use crate::hadax::account::{HadaxApi, HadaxAuth, HadaxBalanceSheet, HadaxOrderParams, HadaxRestClient, DEPTH_STEP, HADAX_NAME};
use crate::order::{normalize, parse_numeric_id, OrderLifecycle, OrderState};
use crate::orderbook::{convert_levels, parse_number, BookSide};
use crate::traits::*;
use crate::utils::{RateLimiterConfig, RequestDispatcher};
use crate::venue::{dispatcher_config, now_ms, VenueBase, VenueDefaults};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Requests per window for each credential class
const REQUESTS_PER_WINDOW: u32 = 100;
const RATE_WINDOW: Duration = Duration::from_secs(10);

/// Flat trade fee, as a fraction of notional
const TRADE_FEE: f64 = 0.002;

/// Unified Huobi Hadax spot adapter
pub struct HadaxSpotAdapter<A = HadaxRestClient> {
    base: VenueBase,
    api: A,
}

/// Venue defaults before configuration is applied
pub fn venue_defaults() -> VenueDefaults {
    VenueDefaults {
        identity: VenueIdentity {
            name: HADAX_NAME.to_string(),
            enabled: true,
            asset_classes: vec![AssetClass::Spot],
            features: Features {
                supports: SupportedFeatures {
                    auto_pair_updates: true,
                    rest_ticker_batching: false,
                    rest: true,
                    websocket: false,
                },
                enabled: EnabledFeatures { auto_pair_updates: true },
            },
            withdraw_permissions: WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_SETUP,
        },
        config_format: PairFormat::new("-", true),
        request_format: PairFormat::new("", false),
        verbose: true,
    }
}

/// Crypto withdrawal fees per currency, in units of that currency
fn withdrawal_fee(currency: &str) -> Option<f64> {
    match currency.to_uppercase().as_str() {
        "BTC" => Some(0.001),
        "ETH" => Some(0.01),
        "LTC" => Some(0.001),
        "USDT" => Some(2.0),
        "HT" => Some(1.0),
        _ => None,
    }
}

impl HadaxSpotAdapter<HadaxRestClient> {
    /// Builds the adapter with its HTTP binding from venue configuration
    pub fn from_config(
        config: &VenueConfig,
        cache: Arc<MarketDataCache>,
        pair_store: Option<Arc<dyn PairStore>>,
    ) -> Result<Self> {
        let quota = RateLimiterConfig::new(REQUESTS_PER_WINDOW, RATE_WINDOW);
        let dispatcher = RequestDispatcher::new(HADAX_NAME, dispatcher_config(config, quota.clone(), quota)?)?;
        let auth = config.credentials.as_ref().map(HadaxAuth::from_credentials);
        Self::with_api(HadaxRestClient::new(dispatcher, auth), config, cache, pair_store)
    }
}

impl<A: HadaxApi> HadaxSpotAdapter<A> {
    pub fn with_api(
        api: A,
        config: &VenueConfig,
        cache: Arc<MarketDataCache>,
        pair_store: Option<Arc<dyn PairStore>>,
    ) -> Result<Self> {
        let base = VenueBase::from_config(venue_defaults(), config, cache, pair_store)?;
        Ok(Self { base, api })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn base(&self) -> &VenueBase {
        &self.base
    }
}

/// Folds `trade`/`frozen` lines into per-currency balances, first-seen order
fn fold_balances(sheet: &HadaxBalanceSheet) -> Vec<Balance> {
    let mut balances: Vec<Balance> = Vec::new();
    for entry in &sheet.list {
        let amount = parse_number(Some(&entry.balance)).unwrap_or(0.0);
        let currency = entry.currency.to_uppercase();

        let index = match balances.iter().position(|b| b.currency == currency) {
            Some(index) => index,
            None => {
                balances.push(Balance {
                    currency,
                    available: 0.0,
                    total: 0.0,
                });
                balances.len() - 1
            }
        };

        let balance = &mut balances[index];
        if entry.kind.eq_ignore_ascii_case("trade") {
            balance.available += amount;
        }
        balance.total += amount;
    }
    balances
}

#[async_trait::async_trait]
impl<A: HadaxApi> VenueAdapter for HadaxSpotAdapter<A> {
    fn identity(&self) -> &VenueIdentity {
        self.base.identity()
    }

    fn cache(&self) -> &MarketDataCache {
        self.base.cache()
    }

    fn enabled_pairs(&self) -> Vec<CurrencyPair> {
        self.base.enabled_pairs()
    }

    async fn run(&self) {
        if !self.base.is_enabled() {
            return;
        }
        self.base.log_enabled_pairs();

        if !self.identity().features.auto_pair_updates_active() {
            return;
        }

        if let Err(e) = self.update_tradable_pairs(false).await {
            error!(venue = %self.name(), error = %e, "Failed to update tradable pairs");
        }
    }

    async fn fetch_tradable_pairs(&self) -> Result<Vec<String>> {
        let symbols = self.api.get_symbols().await?;
        Ok(symbols.iter().map(|s| s.pair_string()).collect())
    }

    async fn update_tradable_pairs(&self, force: bool) -> Result<()> {
        let features = self.identity().features;
        if !features.supports.auto_pair_updates {
            return Err(self.base.unsupported(Operation::UpdateTradablePairs));
        }
        if !features.enabled.auto_pair_updates {
            debug!(venue = %self.name(), "Automatic pair updates disabled, skipping refresh");
            return Ok(());
        }

        let pairs = self.fetch_tradable_pairs().await?;
        self.base.update_pairs(&pairs, force)?;
        Ok(())
    }

    async fn update_ticker(&self, pair: &CurrencyPair, asset: AssetClass) -> Result<TickerSnapshot> {
        self.base.check_asset(asset)?;
        let symbol = self.base.request_symbol(pair);
        let tick = self.api.get_market_detail_merged(&symbol).await?;

        let snapshot = TickerSnapshot {
            venue: self.name().to_string(),
            pair: pair.clone(),
            asset_class: asset,
            last: tick.close,
            high: tick.high,
            low: tick.low,
            bid: tick.bid.first().copied().unwrap_or(0.0),
            ask: tick.ask.first().copied().unwrap_or(0.0),
            volume: tick.vol,
            updated_ms: now_ms(),
        };
        Ok(self.cache().store_ticker(snapshot))
    }

    async fn update_orderbook(&self, pair: &CurrencyPair, asset: AssetClass) -> Result<OrderBookSnapshot> {
        self.base.check_asset(asset)?;
        let symbol = self.base.request_symbol(pair);
        let depth = self.api.get_depth(&symbol, DEPTH_STEP).await?;

        let venue = self.name();
        let book = OrderBookSnapshot {
            venue: venue.to_string(),
            pair: pair.clone(),
            asset_class: asset,
            bids: convert_levels(venue, pair, BookSide::Bid, &depth.bids),
            asks: convert_levels(venue, pair, BookSide::Ask, &depth.asks),
            updated_ms: now_ms(),
        };
        Ok(self.cache().store_orderbook(book))
    }

    async fn get_account_info(&self) -> Result<AccountInfo> {
        let accounts = self.api.get_accounts().await?;

        let mut info = AccountInfo {
            venue: self.name().to_string(),
            accounts: Vec::with_capacity(accounts.len()),
        };
        for account in accounts {
            let sheet = self.api.get_balance(account.id).await?;
            info.accounts.push(Account {
                id: account.id.to_string(),
                balances: fold_balances(&sheet),
            });
        }
        Ok(info)
    }

    async fn get_funding_history(&self) -> Result<Vec<FundHistory>> {
        Err(self.base.not_yet_implemented(Operation::GetFundingHistory))
    }

    async fn get_exchange_history(&self, _pair: &CurrencyPair, _asset: AssetClass) -> Result<Vec<TradeHistory>> {
        Err(self.base.not_yet_implemented(Operation::GetExchangeHistory))
    }

    async fn submit_order(&self, intent: &OrderIntent) -> Result<SubmitOrderResponse> {
        let mut lifecycle = OrderLifecycle::new(self.name(), &intent.client_ref);
        let order = normalize(intent)?;
        let account_id = parse_numeric_id(&order.client_ref, "account id")?;
        lifecycle.advance(OrderState::Validated);

        let params = HadaxOrderParams {
            account_id: account_id.to_string(),
            amount: order.amount.to_string(),
            price: order.price.map(|p| p.to_string()),
            source: "api".to_string(),
            symbol: self.base.request_symbol(&order.pair),
            kind: order.kind.to_string(),
        };

        lifecycle.advance(OrderState::Submitted);
        match self.api.place_order(&params).await {
            Ok(order_id) => {
                lifecycle.advance(OrderState::Accepted);
                info!(
                    venue = %self.name(),
                    order_id,
                    account_id,
                    kind = %order.kind,
                    pair = %order.pair,
                    "Order placed"
                );
                Ok(SubmitOrderResponse::from_venue(Some(order_id.to_string()), true))
            }
            Err(e @ AdapterError::Rejected { .. }) => {
                lifecycle.advance(OrderState::RejectedByVenue);
                warn!(venue = %self.name(), pair = %order.pair, error = %e, "Order rejected by venue");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn modify_order(&self, _order_id: i64, _action: &ModifyOrder) -> Result<i64> {
        Err(self.base.not_yet_implemented(Operation::ModifyOrder))
    }

    async fn cancel_order(&self, cancel: &OrderCancellation) -> Result<()> {
        let order_id = parse_numeric_id(&cancel.order_id, "order id")?;
        let cancelled = self.api.cancel_order(order_id).await?;
        debug!(venue = %self.name(), order_id = cancelled, "Cancellation submitted");
        Ok(())
    }

    async fn cancel_all_orders(&self) -> Result<()> {
        Err(self.base.not_yet_implemented(Operation::CancelAllOrders))
    }

    async fn get_order_info(&self, _order_id: i64) -> Result<OrderDetail> {
        Err(self.base.not_yet_implemented(Operation::GetOrderInfo))
    }

    async fn get_deposit_address(&self, _currency: &str) -> Result<String> {
        Err(self.base.not_yet_implemented(Operation::GetDepositAddress))
    }

    async fn withdraw_crypto(&self, _address: &str, _currency: &str, _amount: Quantity) -> Result<String> {
        Err(self.base.not_yet_implemented(Operation::WithdrawCrypto))
    }

    async fn withdraw_fiat(&self, _currency: &str, _amount: Quantity) -> Result<String> {
        Err(self.base.not_yet_implemented(Operation::WithdrawFiat))
    }

    async fn withdraw_fiat_to_bank(&self, _currency: &str, _amount: Quantity) -> Result<String> {
        Err(self.base.not_yet_implemented(Operation::WithdrawFiatToBank))
    }

    async fn get_fee_by_type(&self, fee: &FeeBuilder) -> Result<f64> {
        match fee.fee_type {
            FeeType::CryptocurrencyTradeFee => Ok(TRADE_FEE * fee.purchase_price * fee.amount),
            FeeType::CryptocurrencyWithdrawalFee => withdrawal_fee(fee.pair.base())
                .ok_or_else(|| self.base.not_yet_implemented(Operation::GetFeeByType)),
            _ => Err(self.base.not_yet_implemented(Operation::GetFeeByType)),
        }
    }

    fn get_withdraw_capabilities(&self) -> WithdrawPermissions {
        self.identity().withdraw_permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hadax::account::HadaxBalanceEntry;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let defaults = venue_defaults();
        assert_eq!(defaults.identity.name, "HuobiHadax");
        assert!(defaults.identity.features.auto_pair_updates_active());
        assert_eq!(
            defaults.identity.withdraw_permissions,
            WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_SETUP
        );
        let pair = CurrencyPair::new("BTC", "USDT");
        assert_eq!(pair.format(&defaults.config_format), "BTC-USDT");
        assert_eq!(pair.format(&defaults.request_format), "btcusdt");
    }

    #[test]
    fn test_fold_balances() {
        let sheet = HadaxBalanceSheet {
            id: 100009,
            list: vec![
                HadaxBalanceEntry { currency: "usdt".into(), kind: "trade".into(), balance: json!("500.5") },
                HadaxBalanceEntry { currency: "btc".into(), kind: "trade".into(), balance: json!("1.0") },
                HadaxBalanceEntry { currency: "usdt".into(), kind: "frozen".into(), balance: json!("20") },
            ],
        };
        let balances = fold_balances(&sheet);
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0], Balance { currency: "USDT".into(), available: 500.5, total: 520.5 });
        assert_eq!(balances[1], Balance { currency: "BTC".into(), available: 1.0, total: 1.0 });
    }

    #[test]
    fn test_withdrawal_fee_table() {
        assert_eq!(withdrawal_fee("btc"), Some(0.001));
        assert_eq!(withdrawal_fee("DOGE"), None);
    }
}
