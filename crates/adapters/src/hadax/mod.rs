//! Huobi Hadax Exchange Adapter
//!
//! REST spot venue with a public symbol catalogue, so the pair set is refreshed
//! at startup when automatic pair updates are enabled.
//!
//! # Module Structure
//!
//! - [`account`] - Authentication, REST binding and response types
//! - [`spot`] - Spot market adapter
//!
//! # Authentication
//!
//! Huobi signature version 2:
//! - Query parameters: AccessKeyId, SignatureMethod=HmacSHA256, SignatureVersion=2, Timestamp
//! - Pre-signed text: `METHOD\nhost\npath\nsorted-urlencoded-query`
//! - Signature is base64 HMAC-SHA256, appended as the `Signature` parameter
//!
//! # Key Differences from itBit
//!
//! | Feature | Hadax | itBit |
//! |---------|-------|-------|
//! | Symbol catalogue | Yes | No |
//! | Order funding | Account id (client reference) | Wallet selection |
//! | Order ids | Numeric | UUID |
//! | Rate limit | 100 / 10s per class | None published |
//!
//! # API Documentation
//!
//! - REST API: <https://github.com/huobiapi/API_Docs_en/wiki>

pub mod account;
pub mod spot;

pub use account::{HadaxApi, HadaxAuth, HadaxRestClient};
pub use spot::HadaxSpotAdapter;
