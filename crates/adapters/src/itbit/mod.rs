//! itBit Exchange Adapter
//!
//! REST-only spot venue. itBit publishes no symbol catalogue, so the pair set
//! comes entirely from configuration, and orders are always placed from a wallet.
//!
//! # Module Structure
//!
//! - [`account`] - Authentication, REST binding and response types
//! - [`spot`] - Spot market adapter
//!
//! # Authentication
//!
//! itBit signs every private request with HMAC-SHA512:
//! - Message: JSON array `[verb, url, body, nonce, timestamp]`
//! - Digest: `SHA256(nonce + message)`, then `HMAC-SHA512(secret, url + digest)`
//! - Signature is base64-encoded and sent as `Authorization: key:signature`
//! - Required headers: Authorization, X-Auth-Timestamp, X-Auth-Nonce
//!
//! Wallet enumeration is scoped to the user id, carried as the credential client id.
//!
//! # Example
//!
//! ```ignore
//! use adapters::itbit::ItbitSpotAdapter;
//!
//! let adapter = ItbitSpotAdapter::from_config(&venue_config, cache, None)?;
//! let ticker = adapter.fetch_ticker(&CurrencyPair::new("XBT", "USD"), AssetClass::Spot).await?;
//! ```
//!
//! # API Documentation
//!
//! - REST API: <https://api.itbit.com/docs>

pub mod account;
pub mod spot;

pub use account::{ItbitApi, ItbitAuth, ItbitRestClient};
pub use spot::ItbitSpotAdapter;
