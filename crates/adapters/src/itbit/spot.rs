//! itBit Spot Market Adapter
//!
//! Implements [`VenueAdapter`] on top of an [`ItbitApi`] binding.
//!
//! # Order Flow
//!
//! itBit places orders from a wallet, so submission enumerates the user's wallets
//! and uses the first one holding enough of the pair's base currency. Cancellation
//! is wallet-scoped: the wallet address from the cancellation request is passed
//! through untouched.
//!
//! # Limits
//!
//! itBit publishes no request quota, so both buckets are unlimited unless
//! configuration overrides them.

use crate::cache::MarketDataCache;
use crate::config::{PairStore, VenueConfig};
use crate::currency::{CurrencyPair, PairFormat};
use crate::error::{AdapterError, Result};
use crate::itbit::account::{ItbitApi, ItbitAuth, ItbitOrderRequest, ItbitRestClient, ItbitWallet, ITBIT_NAME};
use crate::order::{normalize, select_funding_source, FundingSource, OrderLifecycle, OrderState};
use crate::orderbook::{convert_levels, number_or_zero, BookSide};
use crate::traits::*;
use crate::utils::{RateLimiterConfig, RequestDispatcher};
use crate::venue::{dispatcher_config, now_ms, VenueBase, VenueDefaults};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maker rebate on itBit, as a fraction of notional
const MAKER_FEE: f64 = -0.0003;
/// Taker fee on itBit, as a fraction of notional
const TAKER_FEE: f64 = 0.0035;

/// Unified itBit spot adapter
pub struct ItbitSpotAdapter<A = ItbitRestClient> {
    base: VenueBase,
    api: A,
}

/// Venue defaults before configuration is applied
pub fn venue_defaults() -> VenueDefaults {
    VenueDefaults {
        identity: VenueIdentity {
            name: ITBIT_NAME.to_string(),
            enabled: true,
            asset_classes: vec![AssetClass::Spot],
            features: Features {
                supports: SupportedFeatures {
                    auto_pair_updates: false,
                    rest_ticker_batching: false,
                    rest: true,
                    websocket: false,
                },
                enabled: EnabledFeatures { auto_pair_updates: false },
            },
            withdraw_permissions: WithdrawPermissions::WITHDRAW_CRYPTO_VIA_WEBSITE_ONLY
                .union(WithdrawPermissions::WITHDRAW_FIAT_VIA_WEBSITE_ONLY),
        },
        config_format: PairFormat::new("", true),
        request_format: PairFormat::new("", true),
        verbose: true,
    }
}

impl ItbitSpotAdapter<ItbitRestClient> {
    /// Builds the adapter with its HTTP binding from venue configuration
    pub fn from_config(
        config: &VenueConfig,
        cache: Arc<MarketDataCache>,
        pair_store: Option<Arc<dyn PairStore>>,
    ) -> Result<Self> {
        let dispatcher = RequestDispatcher::new(
            ITBIT_NAME,
            dispatcher_config(config, RateLimiterConfig::unlimited(), RateLimiterConfig::unlimited())?,
        )?;
        let auth = config.credentials.as_ref().map(ItbitAuth::from_credentials);
        Self::with_api(ItbitRestClient::new(dispatcher, auth), config, cache, pair_store)
    }
}

impl<A: ItbitApi> ItbitSpotAdapter<A> {
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

/// Flattens wallet balances into funding candidates, in venue order
fn funding_sources(wallets: &[ItbitWallet]) -> Vec<FundingSource> {
    wallets
        .iter()
        .flat_map(|wallet| {
            wallet.balances.iter().map(move |balance| FundingSource {
                id: wallet.id.clone(),
                currency: balance.currency.clone(),
                available: crate::orderbook::parse_number(Some(&balance.available_balance)).unwrap_or(0.0),
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl<A: ItbitApi> VenueAdapter for ItbitSpotAdapter<A> {
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
    }

    async fn fetch_tradable_pairs(&self) -> Result<Vec<String>> {
        Err(self.base.unsupported(Operation::FetchTradablePairs))
    }

    async fn update_tradable_pairs(&self, _force: bool) -> Result<()> {
        Err(self.base.unsupported(Operation::UpdateTradablePairs))
    }

    async fn update_ticker(&self, pair: &CurrencyPair, asset: AssetClass) -> Result<TickerSnapshot> {
        self.base.check_asset(asset)?;
        let symbol = self.base.request_symbol(pair);
        let tick = self.api.get_ticker(&symbol).await?;

        let venue = self.name();
        let snapshot = TickerSnapshot {
            venue: venue.to_string(),
            pair: pair.clone(),
            asset_class: asset,
            last: number_or_zero(venue, pair, "lastPrice", Some(&tick.last_price)),
            high: number_or_zero(venue, pair, "high24h", Some(&tick.high24h)),
            low: number_or_zero(venue, pair, "low24h", Some(&tick.low24h)),
            bid: number_or_zero(venue, pair, "bid", Some(&tick.bid)),
            ask: number_or_zero(venue, pair, "ask", Some(&tick.ask)),
            volume: number_or_zero(venue, pair, "volume24h", Some(&tick.volume24h)),
            updated_ms: now_ms(),
        };
        Ok(self.cache().store_ticker(snapshot))
    }

    async fn update_orderbook(&self, pair: &CurrencyPair, asset: AssetClass) -> Result<OrderBookSnapshot> {
        self.base.check_asset(asset)?;
        let symbol = self.base.request_symbol(pair);
        let depth = self.api.get_orderbook(&symbol).await?;

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
        let wallets = self.api.get_wallets().await?;
        let accounts = wallets
            .iter()
            .map(|wallet| Account {
                id: wallet.id.clone(),
                balances: wallet
                    .balances
                    .iter()
                    .map(|b| Balance {
                        currency: b.currency.to_uppercase(),
                        available: crate::orderbook::parse_number(Some(&b.available_balance)).unwrap_or(0.0),
                        total: crate::orderbook::parse_number(Some(&b.total_balance)).unwrap_or(0.0),
                    })
                    .collect(),
            })
            .collect();

        Ok(AccountInfo {
            venue: self.name().to_string(),
            accounts,
        })
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
        lifecycle.advance(OrderState::Validated);

        let wallets = self.api.get_wallets().await?;
        let sources = funding_sources(&wallets);
        let wallet_id = match select_funding_source(&sources, order.pair.base(), order.amount) {
            Ok(source) => source.id.clone(),
            Err(e) => {
                lifecycle.advance(OrderState::RejectedInsufficientFunds);
                return Err(e);
            }
        };
        lifecycle.advance(OrderState::Funded);

        let client_ref = if order.client_ref.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            order.client_ref.clone()
        };
        let request = ItbitOrderRequest {
            side: order.kind.side_str().to_string(),
            kind: order.kind.kind_str().to_string(),
            currency: order.pair.base().to_string(),
            amount: order.amount.to_string(),
            price: order.price.map(|p| p.to_string()),
            instrument: self.base.request_symbol(&order.pair),
            client_order_identifier: Some(client_ref),
        };

        lifecycle.advance(OrderState::Submitted);
        let placed = self.api.place_order(&wallet_id, &request).await?;

        if placed.is_rejected() {
            lifecycle.advance(OrderState::RejectedByVenue);
            warn!(venue = %self.name(), order_id = %placed.id, pair = %order.pair, "Order rejected by venue");
            return Ok(SubmitOrderResponse::from_venue(Some(placed.id), false));
        }

        lifecycle.advance(OrderState::Accepted);
        info!(
            venue = %self.name(),
            order_id = %placed.id,
            wallet = %wallet_id,
            kind = %order.kind,
            pair = %order.pair,
            "Order placed"
        );
        Ok(SubmitOrderResponse::from_venue(Some(placed.id), true))
    }

    async fn modify_order(&self, _order_id: i64, _action: &ModifyOrder) -> Result<i64> {
        Err(self.base.not_yet_implemented(Operation::ModifyOrder))
    }

    async fn cancel_order(&self, cancel: &OrderCancellation) -> Result<()> {
        let order_id = cancel.order_id.trim();
        if order_id.is_empty() {
            return Err(AdapterError::Validation("order id is required".to_string()));
        }
        let wallet = cancel
            .wallet_address
            .as_deref()
            .filter(|w| !w.is_empty())
            .ok_or_else(|| AdapterError::Validation(format!("{} cancellation requires a wallet address", ITBIT_NAME)))?;

        debug!(venue = %self.name(), order_id, wallet, "Cancelling order");
        self.api.cancel_order(wallet, order_id).await
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
            FeeType::CryptocurrencyTradeFee => {
                let rate = if fee.is_maker { MAKER_FEE } else { TAKER_FEE };
                Ok(rate * fee.purchase_price * fee.amount)
            }
            // Withdrawals only happen through the website and carry no API fee
            FeeType::CryptocurrencyWithdrawalFee => Ok(0.0),
            _ => Err(self.base.not_yet_implemented(Operation::GetFeeByType)),
        }
    }

    fn get_withdraw_capabilities(&self) -> WithdrawPermissions {
        self.identity().withdraw_permissions
    }
}
