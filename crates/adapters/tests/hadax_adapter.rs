//! Huobi Hadax Adapter Integration Tests
//!
//! Run with: cargo test --package adapters --test hadax_adapter

use adapters::error::AdapterError;
use adapters::hadax::account::{
    HadaxAccount, HadaxApi, HadaxBalanceSheet, HadaxDepth, HadaxDetailMerged, HadaxOrderParams, HadaxSymbol,
};
use adapters::hadax::HadaxSpotAdapter;
use adapters::traits::*;
use adapters::{CurrencyPair, MarketDataCache, MemoryPairStore, PairStore, Result, VenueConfig};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// Mock Binding
// =============================================================================

struct MockHadax {
    symbols: Vec<HadaxSymbol>,
    detail: HadaxDetailMerged,
    depth: HadaxDepth,
    reject_orders: bool,
    symbol_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    depth_calls: AtomicUsize,
    place_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    account_calls: AtomicUsize,
    placed: Mutex<Vec<HadaxOrderParams>>,
    depth_steps: Mutex<Vec<String>>,
    cancelled: Mutex<Vec<i64>>,
}

impl MockHadax {
    fn new() -> Self {
        Self {
            symbols: serde_json::from_value(json!([
                {"base-currency": "btc", "quote-currency": "usdt", "price-precision": 2, "amount-precision": 4, "symbol-partition": "main"},
                {"base-currency": "eth", "quote-currency": "btc", "price-precision": 6, "amount-precision": 4, "symbol-partition": "main"}
            ]))
            .unwrap(),
            detail: HadaxDetailMerged::default(),
            depth: HadaxDepth::default(),
            reject_orders: false,
            symbol_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            depth_calls: AtomicUsize::new(0),
            place_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            account_calls: AtomicUsize::new(0),
            placed: Mutex::new(Vec::new()),
            depth_steps: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    fn network_calls(&self) -> usize {
        self.symbol_calls.load(Ordering::SeqCst)
            + self.detail_calls.load(Ordering::SeqCst)
            + self.depth_calls.load(Ordering::SeqCst)
            + self.place_calls.load(Ordering::SeqCst)
            + self.cancel_calls.load(Ordering::SeqCst)
            + self.account_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HadaxApi for MockHadax {
    async fn get_symbols(&self) -> Result<Vec<HadaxSymbol>> {
        self.symbol_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.symbols.clone())
    }

    async fn get_market_detail_merged(&self, _symbol: &str) -> Result<HadaxDetailMerged> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detail.clone())
    }

    async fn get_depth(&self, _symbol: &str, step: &str) -> Result<HadaxDepth> {
        self.depth_calls.fetch_add(1, Ordering::SeqCst);
        self.depth_steps.lock().push(step.to_string());
        Ok(self.depth.clone())
    }

    async fn place_order(&self, params: &HadaxOrderParams) -> Result<i64> {
        self.place_calls.fetch_add(1, Ordering::SeqCst);
        self.placed.lock().push(params.clone());
        if self.reject_orders {
            return Err(AdapterError::rejected("HuobiHadax", "order-value-min-error: order total cannot be lower than 1"));
        }
        Ok(59378)
    }

    async fn cancel_order(&self, order_id: i64) -> Result<i64> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.cancelled.lock().push(order_id);
        Ok(order_id)
    }

    async fn get_accounts(&self) -> Result<Vec<HadaxAccount>> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(json!([{"id": 100009, "type": "spot", "state": "working"}])).unwrap())
    }

    async fn get_balance(&self, account_id: i64) -> Result<HadaxBalanceSheet> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(json!({
            "id": account_id,
            "list": [
                {"currency": "usdt", "type": "trade", "balance": "91.850043797676510303"},
                {"currency": "usdt", "type": "frozen", "balance": "5.16"}
            ]
        }))
        .unwrap())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn btcusdt() -> CurrencyPair {
    CurrencyPair::new("BTC", "USDT")
}

fn config() -> VenueConfig {
    let mut config = VenueConfig::new("HuobiHadax");
    config.enabled_pairs = vec!["BTC-USDT".into()];
    config
}

fn adapter_with(mock: MockHadax, config: &VenueConfig, store: Option<Arc<dyn PairStore>>) -> HadaxSpotAdapter<MockHadax> {
    HadaxSpotAdapter::with_api(mock, config, Arc::new(MarketDataCache::new()), store).unwrap()
}

fn adapter(mock: MockHadax) -> HadaxSpotAdapter<MockHadax> {
    adapter_with(mock, &config(), None)
}

fn intent(side: Side, kind: OrderKind, client_ref: &str) -> OrderIntent {
    OrderIntent {
        pair: btcusdt(),
        side,
        kind,
        amount: 0.25,
        price: 6_500.5,
        client_ref: client_ref.to_string(),
    }
}

// =============================================================================
// Pair Catalogue
// =============================================================================

#[tokio::test]
async fn test_fetch_tradable_pairs_formats_base_quote() {
    let adapter = adapter(MockHadax::new());
    let pairs = adapter.fetch_tradable_pairs().await.unwrap();
    assert_eq!(pairs, vec!["BTC-USDT".to_string(), "ETH-BTC".to_string()]);
}

#[tokio::test]
async fn test_update_tradable_pairs_persists_changes_only() {
    let store = Arc::new(MemoryPairStore::new());
    let adapter = adapter_with(MockHadax::new(), &config(), Some(store.clone()));

    adapter.update_tradable_pairs(false).await.unwrap();
    assert_eq!(store.writes(), 1);
    assert_eq!(
        store.pairs("HuobiHadax").unwrap(),
        vec!["BTC-USDT".to_string(), "ETH-BTC".to_string()]
    );
    assert_eq!(adapter.enabled_pairs(), vec![btcusdt(), CurrencyPair::new("ETH", "BTC")]);

    // Same catalogue again: nothing to write unless forced
    adapter.update_tradable_pairs(false).await.unwrap();
    assert_eq!(store.writes(), 1);

    adapter.update_tradable_pairs(true).await.unwrap();
    assert_eq!(store.writes(), 2);
    assert_eq!(adapter.api().symbol_calls.load(Ordering::SeqCst), 3);
}

/// Pair store that refuses its first write
#[derive(Default)]
struct FlakyPairStore {
    calls: AtomicUsize,
    stored: Mutex<Vec<String>>,
}

impl PairStore for FlakyPairStore {
    fn store_pairs(&self, _venue: &str, pairs: &[String]) -> Result<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(AdapterError::Config("config file locked".to_string()));
        }
        *self.stored.lock() = pairs.to_vec();
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_pair_write_back_is_retried() {
    let store = Arc::new(FlakyPairStore::default());
    let mut config = config();
    config.enabled_pairs = vec!["ETH-BTC".into()];
    let mut mock = MockHadax::new();
    mock.symbols.truncate(1);
    let adapter = adapter_with(mock, &config, Some(store.clone()));

    assert!(adapter.update_tradable_pairs(false).await.is_err());
    assert_eq!(adapter.enabled_pairs(), vec![CurrencyPair::new("ETH", "BTC")]);

    adapter.update_tradable_pairs(false).await.unwrap();
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    assert_eq!(*store.stored.lock(), vec!["BTC-USDT".to_string()]);
    assert_eq!(adapter.enabled_pairs(), vec![btcusdt()]);
}

#[tokio::test]
async fn test_update_tradable_pairs_disabled_is_silent_no_op() {
    let store = Arc::new(MemoryPairStore::new());
    let mut config = config();
    config.auto_pair_updates = Some(false);
    let adapter = adapter_with(MockHadax::new(), &config, Some(store.clone()));

    adapter.update_tradable_pairs(true).await.unwrap();
    adapter.run().await;

    assert_eq!(adapter.api().network_calls(), 0);
    assert_eq!(store.writes(), 0);
    assert_eq!(adapter.enabled_pairs(), vec![btcusdt()]);
}

#[tokio::test]
async fn test_run_refreshes_catalogue_when_enabled() {
    let store = Arc::new(MemoryPairStore::new());
    let adapter = adapter_with(MockHadax::new(), &config(), Some(store.clone()));

    adapter.run().await;

    assert_eq!(adapter.api().symbol_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_disabled_venue_run_returns_immediately() {
    let mut config = config();
    config.enabled = false;
    let adapter = adapter_with(MockHadax::new(), &config, None);

    adapter.run().await;

    assert!(!adapter.identity().enabled);
    assert_eq!(adapter.api().network_calls(), 0);
}

// =============================================================================
// Market Data
// =============================================================================

#[tokio::test]
async fn test_ticker_with_missing_bid_ask_defaults_to_zero() {
    let mut mock = MockHadax::new();
    mock.detail = serde_json::from_value(json!({
        "close": 6512.3, "high": 6600.0, "low": 6400.0, "vol": 1234.5, "bid": [], "ask": [6513.0, 0.2]
    }))
    .unwrap();
    let adapter = adapter(mock);

    let ticker = adapter.fetch_ticker(&btcusdt(), AssetClass::Spot).await.unwrap();

    assert_eq!(ticker.last, 6512.3);
    assert_eq!(ticker.high, 6600.0);
    assert_eq!(ticker.low, 6400.0);
    assert_eq!(ticker.volume, 1234.5);
    assert_eq!(ticker.bid, 0.0);
    assert_eq!(ticker.ask, 6513.0);

    adapter.fetch_ticker(&btcusdt(), AssetClass::Spot).await.unwrap();
    assert_eq!(adapter.api().detail_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_depth_uses_step1_and_keeps_venue_order() {
    let mut mock = MockHadax::new();
    mock.depth = serde_json::from_value(json!({
        "bids": [[6500.5, 0.1], [6499.0, 1.2], [6480.0, "x"]],
        "asks": [[6501.0, 0.3], [6505.5, 2.0]],
        "ts": 1530000000000u64
    }))
    .unwrap();
    let adapter = adapter(mock);

    let book = adapter.update_orderbook(&btcusdt(), AssetClass::Spot).await.unwrap();

    assert_eq!(adapter.api().depth_steps.lock().as_slice(), ["step1".to_string()]);
    assert_eq!(book.bids.len(), 3);
    assert_eq!(book.bids[0], OrderBookLevel { price: 6500.5, amount: 0.1 });
    assert_eq!(book.bids[2], OrderBookLevel { price: 6480.0, amount: 0.0 });
    assert_eq!(book.asks[0].price, 6501.0);
    assert_eq!(book.asks[1].price, 6505.5);
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_order_kinds_map_to_venue_types() {
    let adapter = adapter(MockHadax::new());
    let cases = [
        (Side::Buy, OrderKind::Market, "buy-market", None),
        (Side::Sell, OrderKind::Market, "sell-market", None),
        (Side::Buy, OrderKind::Limit, "buy-limit", Some("6500.5")),
        (Side::Sell, OrderKind::Limit, "sell-limit", Some("6500.5")),
    ];

    for (side, kind, _, _) in cases {
        let response = adapter.submit_order(&intent(side, kind, "100009")).await.unwrap();
        assert!(response.placed);
        assert_eq!(response.order_id, "59378");
    }

    let placed = adapter.api().placed.lock();
    for (params, (_, _, venue_type, price)) in placed.iter().zip(cases) {
        assert_eq!(params.kind, venue_type);
        assert_eq!(params.price.as_deref(), price);
        assert_eq!(params.account_id, "100009");
        assert_eq!(params.symbol, "btcusdt");
        assert_eq!(params.source, "api");
        assert_eq!(params.amount, "0.25");
    }
}

#[tokio::test]
async fn test_account_id_accepts_prefixed_forms() {
    let adapter = adapter(MockHadax::new());
    adapter.submit_order(&intent(Side::Buy, OrderKind::Market, "0x186a9")).await.unwrap();
    assert_eq!(adapter.api().placed.lock()[0].account_id, "100009");
}

#[tokio::test]
async fn test_invalid_account_id_rejected_before_network() {
    let adapter = adapter(MockHadax::new());

    for bad in ["", "main-account", "12abc"] {
        let result = adapter.submit_order(&intent(Side::Buy, OrderKind::Limit, bad)).await;
        assert!(matches!(result, Err(AdapterError::Validation(_))), "{:?}", bad);
    }
    assert_eq!(adapter.api().network_calls(), 0);
}

#[tokio::test]
async fn test_unsupported_combination_rejected_before_network() {
    let adapter = adapter(MockHadax::new());
    let result = adapter.submit_order(&intent(Side::Bid, OrderKind::Limit, "100009")).await;
    assert!(matches!(result, Err(AdapterError::Validation(_))));
    let result = adapter.submit_order(&intent(Side::Buy, OrderKind::StopLossLimit, "100009")).await;
    assert!(matches!(result, Err(AdapterError::Validation(_))));
    assert_eq!(adapter.api().network_calls(), 0);
}

#[tokio::test]
async fn test_venue_rejection_is_surfaced() {
    let mut mock = MockHadax::new();
    mock.reject_orders = true;
    let adapter = adapter(mock);

    let result = adapter.submit_order(&intent(Side::Sell, OrderKind::Limit, "100009")).await;
    match result {
        Err(err @ AdapterError::Rejected { .. }) => assert!(!err.is_retryable()),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_parses_numeric_order_id() {
    let adapter = adapter(MockHadax::new());

    adapter
        .cancel_order(&OrderCancellation { order_id: "59378".into(), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(adapter.api().cancelled.lock().as_slice(), [59378]);

    let result = adapter
        .cancel_order(&OrderCancellation { order_id: "not-a-number".into(), ..Default::default() })
        .await;
    assert!(matches!(result, Err(AdapterError::Validation(_))));
    assert_eq!(adapter.api().cancel_calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Account, Fees & Capabilities
// =============================================================================

#[tokio::test]
async fn test_account_info_folds_trade_and_frozen() {
    let adapter = adapter(MockHadax::new());
    let info = adapter.get_account_info().await.unwrap();

    assert_eq!(info.venue, "HuobiHadax");
    assert_eq!(info.accounts[0].id, "100009");
    let usdt = &info.accounts[0].balances[0];
    assert_eq!(usdt.currency, "USDT");
    assert!((usdt.available - 91.850043797676510303).abs() < 1e-9);
    assert!((usdt.total - 97.010043797676510303).abs() < 1e-9);
}

#[tokio::test]
async fn test_not_yet_implemented_operations() {
    let adapter = adapter(MockHadax::new());

    assert!(matches!(
        adapter.get_funding_history().await,
        Err(AdapterError::NotYetImplemented { operation: Operation::GetFundingHistory, .. })
    ));
    assert!(matches!(
        adapter.modify_order(59378, &ModifyOrder { price: Some(1.0), ..Default::default() }).await,
        Err(AdapterError::NotYetImplemented { operation: Operation::ModifyOrder, .. })
    ));
    assert!(matches!(
        adapter.cancel_all_orders().await,
        Err(AdapterError::NotYetImplemented { operation: Operation::CancelAllOrders, .. })
    ));
    assert!(matches!(
        adapter.get_order_info(59378).await,
        Err(AdapterError::NotYetImplemented { .. })
    ));
    assert!(matches!(
        adapter.withdraw_crypto("addr", "BTC", 0.1).await,
        Err(AdapterError::NotYetImplemented { .. })
    ));
    assert_eq!(adapter.api().network_calls(), 0);
}

#[tokio::test]
async fn test_fees_and_withdraw_capabilities() {
    let adapter = adapter(MockHadax::new());
    let mut fee = FeeBuilder {
        fee_type: FeeType::CryptocurrencyTradeFee,
        pair: btcusdt(),
        purchase_price: 6_000.0,
        amount: 0.5,
        is_maker: true,
    };
    assert!((adapter.get_fee_by_type(&fee).await.unwrap() - 6.0).abs() < 1e-9);

    fee.fee_type = FeeType::CryptocurrencyWithdrawalFee;
    assert_eq!(adapter.get_fee_by_type(&fee).await.unwrap(), 0.001);

    fee.fee_type = FeeType::InternationalBankWithdrawalFee;
    assert!(adapter.get_fee_by_type(&fee).await.unwrap_err().is_capability_gap());

    assert_eq!(
        adapter.get_withdraw_capabilities(),
        WithdrawPermissions::AUTO_WITHDRAW_CRYPTO_WITH_SETUP
    );
}
