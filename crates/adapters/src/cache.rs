//! Market data cache
//!
//! Holds the latest ticker and order-book snapshot per `(venue, pair, asset class)`.
//! The host owns one instance and injects it into every adapter, so tests can use
//! an isolated cache per case.
//!
//! There is no expiry: a snapshot stays valid until the next refresh replaces it.
//! Each insert swaps the whole value under the shard lock, so readers see either
//! the previous snapshot or the new one, never a mix.

use crate::currency::CurrencyPair;
use crate::traits::{AssetClass, OrderBookSnapshot, TickerSnapshot};
use dashmap::DashMap;
use tracing::debug;

/// Cache key; venue names compare case-insensitively
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    venue: String,
    pair: CurrencyPair,
    asset: AssetClass,
}

impl SnapshotKey {
    pub fn new(venue: &str, pair: &CurrencyPair, asset: AssetClass) -> Self {
        Self {
            venue: venue.to_lowercase(),
            pair: pair.clone(),
            asset,
        }
    }
}

/// Keyed store of live snapshots shared by all adapters of a process
#[derive(Default)]
pub struct MarketDataCache {
    tickers: DashMap<SnapshotKey, TickerSnapshot>,
    orderbooks: DashMap<SnapshotKey, OrderBookSnapshot>,
}

impl MarketDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticker(&self, venue: &str, pair: &CurrencyPair, asset: AssetClass) -> Option<TickerSnapshot> {
        self.tickers
            .get(&SnapshotKey::new(venue, pair, asset))
            .map(|entry| entry.value().clone())
    }

    /// Stores a ticker, replacing any previous snapshot for the key, and returns
    /// the stored value
    pub fn store_ticker(&self, ticker: TickerSnapshot) -> TickerSnapshot {
        let key = SnapshotKey::new(&ticker.venue, &ticker.pair, ticker.asset_class);
        debug!(venue = %ticker.venue, pair = %ticker.pair, asset = %ticker.asset_class, "Ticker snapshot stored");
        self.tickers.insert(key, ticker.clone());
        ticker
    }

    pub fn orderbook(&self, venue: &str, pair: &CurrencyPair, asset: AssetClass) -> Option<OrderBookSnapshot> {
        self.orderbooks
            .get(&SnapshotKey::new(venue, pair, asset))
            .map(|entry| entry.value().clone())
    }

    /// Stores an order book wholesale; partial updates are not supported
    pub fn store_orderbook(&self, book: OrderBookSnapshot) -> OrderBookSnapshot {
        let key = SnapshotKey::new(&book.venue, &book.pair, book.asset_class);
        debug!(
            venue = %book.venue,
            pair = %book.pair,
            bids = book.bids.len(),
            asks = book.asks.len(),
            "Order book snapshot stored"
        );
        self.orderbooks.insert(key, book.clone());
        book
    }

    pub fn ticker_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn orderbook_count(&self) -> usize {
        self.orderbooks.len()
    }
}
