//! Venue adapter layer
//!
//! Presents heterogeneous exchange REST APIs behind one capability-gated
//! contract, [`VenueAdapter`]: market data is cached per `(venue, pair, asset)`,
//! every outbound call goes through a rate-limited [`utils::RequestDispatcher`],
//! and generic order intents are normalized and funded before submission.
//!
//! # Venues
//!
//! - [`itbit`] - itBit spot (REST, wallet-funded orders)
//! - [`hadax`] - Huobi Hadax spot (REST, symbol catalogue)

pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod hadax;
pub mod itbit;
pub mod order;
pub mod orderbook;
pub mod registry;
pub mod supervisor;
pub mod traits;
pub mod utils;
pub mod venue;

pub use cache::MarketDataCache;
pub use config::{ConfigFilePairStore, GatewayConfig, MemoryPairStore, PairStore, VenueConfig};
pub use currency::{CurrencyPair, PairFormat};
pub use error::{AdapterError, Result, TransportError};
pub use registry::VenueRegistry;
pub use supervisor::{TaskOutcome, VenueSupervisor};
pub use traits::VenueAdapter;
