//! Canonical currency pairs and venue pair formats

use crate::error::{AdapterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiters recognised when parsing a pair string
const KNOWN_DELIMITERS: [&str; 4] = ["-", "_", "/", ":"];

/// Venue-agnostic base/quote pair
///
/// Codes are stored uppercase and without a delimiter, so `btc-usd`, `BTC_USD`
/// and `BTCUSD` all compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim().to_uppercase(),
            quote: quote.as_ref().trim().to_uppercase(),
        }
    }

    /// Parses `BASE<delim>QUOTE` for any known delimiter, or a six letter
    /// undelimited code split 3/3 (`XBTUSD`)
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        for delimiter in KNOWN_DELIMITERS {
            if raw.contains(delimiter) {
                return Self::parse_with_delimiter(raw, delimiter);
            }
        }

        if raw.len() == 6 && raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            let (base, quote) = raw.split_at(3);
            return Ok(Self::new(base, quote));
        }

        Err(AdapterError::Validation(format!(
            "cannot split currency pair '{}' into base and quote",
            raw
        )))
    }

    pub fn parse_with_delimiter(raw: &str, delimiter: &str) -> Result<Self> {
        if delimiter.is_empty() {
            return Self::parse(raw);
        }

        let mut parts = raw.split(delimiter);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.trim().is_empty() && !quote.trim().is_empty() => {
                Ok(Self::new(base, quote))
            }
            _ => Err(AdapterError::Validation(format!(
                "malformed currency pair '{}' for delimiter '{}'",
                raw, delimiter
            ))),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Renders the pair in a venue's format
    pub fn format(&self, format: &PairFormat) -> String {
        let joined = format!("{}{}{}", self.base, format.delimiter, self.quote);
        if format.uppercase {
            joined
        } else {
            joined.to_lowercase()
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Delimiter and case rules a venue applies to pair strings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFormat {
    #[serde(default)]
    pub delimiter: String,
    #[serde(default = "default_uppercase")]
    pub uppercase: bool,
}

fn default_uppercase() -> bool {
    true
}

impl Default for PairFormat {
    fn default() -> Self {
        Self {
            delimiter: String::new(),
            uppercase: true,
        }
    }
}

impl PairFormat {
    pub fn new(delimiter: impl Into<String>, uppercase: bool) -> Self {
        Self {
            delimiter: delimiter.into(),
            uppercase,
        }
    }

    pub fn parse(&self, raw: &str) -> Result<CurrencyPair> {
        CurrencyPair::parse_with_delimiter(raw, &self.delimiter)
    }
}
