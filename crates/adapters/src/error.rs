//! Error taxonomy shared by every venue adapter
//!
//! Callers branch on the variant, never on the message:
//!
//! - [`AdapterError::Unsupported`] / [`AdapterError::NotYetImplemented`] are terminal
//!   for the call and distinguishable for operators (see [`AdapterError::is_capability_gap`])
//! - [`AdapterError::Validation`] and [`AdapterError::InsufficientFunds`] are raised
//!   before any order reaches the venue
//! - [`AdapterError::Transport`] is surfaced unchanged from the dispatcher and is the
//!   only kind a caller may retry
//!
//! Unparsable market-data fields are not errors: they are zeroed and logged as
//! partial-data warnings by the order-book converter.

use crate::traits::Operation;
use thiserror::Error;

/// Failures of the outbound HTTP exchange itself
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                code: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Error type returned by every adapter operation
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{venue}: {operation} is not supported by this venue")]
    Unsupported { venue: String, operation: Operation },

    #[error("{venue}: {operation} is not yet implemented")]
    NotYetImplemented { venue: String, operation: Operation },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient funds: no funding source holds {amount} {currency}")]
    InsufficientFunds { currency: String, amount: f64 },

    #[error("{venue}: transport error: {source}")]
    Transport {
        venue: String,
        #[source]
        source: TransportError,
    },

    #[error("{venue}: request rejected by venue: {reason}")]
    Rejected { venue: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl AdapterError {
    pub fn transport(venue: impl Into<String>, source: impl Into<TransportError>) -> Self {
        AdapterError::Transport {
            venue: venue.into(),
            source: source.into(),
        }
    }

    pub fn rejected(venue: impl Into<String>, reason: impl Into<String>) -> Self {
        AdapterError::Rejected {
            venue: venue.into(),
            reason: reason.into(),
        }
    }

    /// True for `Unsupported` and `NotYetImplemented`
    pub fn is_capability_gap(&self) -> bool {
        matches!(
            self,
            AdapterError::Unsupported { .. } | AdapterError::NotYetImplemented { .. }
        )
    }

    /// Only transport failures may be retried, and only by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
