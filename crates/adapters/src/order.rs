//! Order normalizer
//!
//! Turns a generic [`OrderIntent`] into venue-ready parameters and checks its
//! feasibility before anything is sent:
//!
//! 1. `(side, kind)` must be one of `{buy, sell} × {market, limit}`
//! 2. limit orders carry their price, market orders never do
//! 3. venues that place orders from a funding source (wallet) get the first
//!    source holding enough of the pair's base currency
//!
//! Every submission walks the lifecycle
//! `Requested → Validated → (Funded | RejectedInsufficientFunds) → Submitted → (Accepted | RejectedByVenue)`,
//! tracked by [`OrderLifecycle`]. Venues without funding selection go straight
//! from `Validated` to `Submitted`.

use crate::currency::CurrencyPair;
use crate::error::{AdapterError, Result};
use crate::traits::{OrderIntent, OrderKind, Price, Quantity, Side, SubmitOrderResponse};
use std::fmt;
use tracing::{debug, warn};

// ============================================================================
// Lifecycle
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderState {
    Requested,
    Validated,
    Funded,
    RejectedInsufficientFunds,
    Submitted,
    Accepted,
    RejectedByVenue,
}

impl OrderState {
    pub fn can_transition_to(self, next: OrderState) -> bool {
        use OrderState::*;
        matches!(
            (self, next),
            (Requested, Validated)
                | (Validated, Funded)
                | (Validated, RejectedInsufficientFunds)
                | (Validated, Submitted)
                | (Funded, Submitted)
                | (Submitted, Accepted)
                | (Submitted, RejectedByVenue)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Accepted | OrderState::RejectedByVenue | OrderState::RejectedInsufficientFunds
        )
    }
}

/// Per-submission state tracker
#[derive(Debug)]
pub struct OrderLifecycle {
    venue: String,
    client_ref: String,
    state: OrderState,
}

impl OrderLifecycle {
    pub fn new(venue: &str, client_ref: &str) -> Self {
        Self {
            venue: venue.to_string(),
            client_ref: client_ref.to_string(),
            state: OrderState::Requested,
        }
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn advance(&mut self, next: OrderState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal order transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(
            venue = %self.venue,
            client_ref = %self.client_ref,
            from = ?self.state,
            to = ?next,
            "Order state transition"
        );
        self.state = next;
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// The four supported side × kind combinations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormalizedKind {
    BuyMarket,
    SellMarket,
    BuyLimit,
    SellLimit,
}

impl NormalizedKind {
    pub fn from_parts(side: Side, kind: OrderKind) -> Result<Self> {
        match (side, kind) {
            (Side::Buy, OrderKind::Market) => Ok(NormalizedKind::BuyMarket),
            (Side::Sell, OrderKind::Market) => Ok(NormalizedKind::SellMarket),
            (Side::Buy, OrderKind::Limit) => Ok(NormalizedKind::BuyLimit),
            (Side::Sell, OrderKind::Limit) => Ok(NormalizedKind::SellLimit),
            (side, kind) => Err(AdapterError::Validation(format!(
                "unsupported order combination: side {:?} with kind {:?}",
                side, kind
            ))),
        }
    }

    pub fn is_buy(self) -> bool {
        matches!(self, NormalizedKind::BuyMarket | NormalizedKind::BuyLimit)
    }

    pub fn is_limit(self) -> bool {
        matches!(self, NormalizedKind::BuyLimit | NormalizedKind::SellLimit)
    }

    pub fn side_str(self) -> &'static str {
        if self.is_buy() {
            "buy"
        } else {
            "sell"
        }
    }

    pub fn kind_str(self) -> &'static str {
        if self.is_limit() {
            "limit"
        } else {
            "market"
        }
    }
}

impl fmt::Display for NormalizedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.side_str(), self.kind_str())
    }
}

/// Validated order ready to be mapped onto a venue request
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedOrder {
    pub pair: CurrencyPair,
    pub kind: NormalizedKind,
    pub amount: Quantity,
    /// Present for limit orders only
    pub price: Option<Price>,
    pub client_ref: String,
}

pub fn normalize(intent: &OrderIntent) -> Result<NormalizedOrder> {
    let kind = NormalizedKind::from_parts(intent.side, intent.kind)?;

    if !intent.amount.is_finite() || intent.amount <= 0.0 {
        return Err(AdapterError::Validation(format!(
            "order amount must be positive, got {}",
            intent.amount
        )));
    }

    let price = if kind.is_limit() {
        if !intent.price.is_finite() || intent.price <= 0.0 {
            return Err(AdapterError::Validation(format!(
                "limit order price must be positive, got {}",
                intent.price
            )));
        }
        Some(intent.price)
    } else {
        None
    };

    Ok(NormalizedOrder {
        pair: intent.pair.clone(),
        kind,
        amount: intent.amount,
        price,
        client_ref: intent.client_ref.clone(),
    })
}

// ============================================================================
// Funding Sources
// ============================================================================

/// One balance of one wallet that an order may be placed from
#[derive(Clone, Debug, PartialEq)]
pub struct FundingSource {
    pub id: String,
    pub currency: String,
    pub available: Quantity,
}

/// Picks the first source in `currency` holding at least `amount`
pub fn select_funding_source<'a>(
    sources: &'a [FundingSource],
    currency: &str,
    amount: Quantity,
) -> Result<&'a FundingSource> {
    sources
        .iter()
        .find(|s| s.currency.eq_ignore_ascii_case(currency) && s.available >= amount)
        .ok_or_else(|| {
            warn!(currency, amount, candidates = sources.len(), "No funding source qualifies");
            AdapterError::InsufficientFunds {
                currency: currency.to_uppercase(),
                amount,
            }
        })
}

// ============================================================================
// Identifiers & Responses
// ============================================================================

/// Parses a numeric identifier, accepting `0x`, `0o` and `0b` prefixes
pub fn parse_numeric_id(raw: &str, what: &str) -> Result<i64> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let lower = digits.to_ascii_lowercase();
    let (radix, magnitude) = if let Some(hex) = lower.strip_prefix("0x") {
        (16, hex)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (8, oct)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (2, bin)
    } else {
        (10, lower.as_str())
    };

    let invalid = |reason: String| AdapterError::Validation(format!("invalid {} '{}': {}", what, raw, reason));
    if magnitude.starts_with(|c: char| c == '+' || c == '-') {
        return Err(invalid("misplaced sign".to_string()));
    }

    // Sign and digits parse together so i64::MIN stays representable
    let signed = if negative {
        format!("-{}", magnitude)
    } else {
        magnitude.to_string()
    };
    i64::from_str_radix(&signed, radix).map_err(|e| invalid(e.to_string()))
}

impl SubmitOrderResponse {
    /// Builds the response from what the venue returned; `accepted` alone decides
    /// the placed flag
    pub fn from_venue(order_id: Option<String>, accepted: bool) -> Self {
        Self {
            order_id: order_id.unwrap_or_default(),
            placed: accepted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(side: Side, kind: OrderKind) -> OrderIntent {
        OrderIntent {
            pair: CurrencyPair::new("BTC", "USD"),
            side,
            kind,
            amount: 1.0,
            price: 20_000.0,
            client_ref: "ref-1".to_string(),
        }
    }

    #[test]
    fn test_mapping_is_total_over_supported_matrix() {
        let cases = [
            (Side::Buy, OrderKind::Market, NormalizedKind::BuyMarket),
            (Side::Sell, OrderKind::Market, NormalizedKind::SellMarket),
            (Side::Buy, OrderKind::Limit, NormalizedKind::BuyLimit),
            (Side::Sell, OrderKind::Limit, NormalizedKind::SellLimit),
        ];
        for (side, kind, expected) in cases {
            assert_eq!(normalize(&intent(side, kind)).unwrap().kind, expected);
        }
    }

    #[test]
    fn test_everything_else_is_rejected() {
        let sides = [Side::Buy, Side::Sell, Side::Bid, Side::Ask];
        let kinds = [
            OrderKind::Market,
            OrderKind::Limit,
            OrderKind::StopLoss,
            OrderKind::StopLossLimit,
            OrderKind::TakeProfit,
            OrderKind::TakeProfitLimit,
        ];
        for side in sides {
            for kind in kinds {
                let supported = matches!(side, Side::Buy | Side::Sell)
                    && matches!(kind, OrderKind::Market | OrderKind::Limit);
                let result = normalize(&intent(side, kind));
                if supported {
                    assert!(result.is_ok());
                } else {
                    assert!(matches!(result, Err(AdapterError::Validation(_))));
                }
            }
        }
    }

    #[test]
    fn test_price_only_attached_to_limit_orders() {
        let limit = normalize(&intent(Side::Sell, OrderKind::Limit)).unwrap();
        let market = normalize(&intent(Side::Sell, OrderKind::Market)).unwrap();
        assert_eq!(limit.price, Some(20_000.0));
        assert_eq!(market.price, None);
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let mut bad = intent(Side::Buy, OrderKind::Market);
        bad.amount = 0.0;
        assert!(matches!(normalize(&bad), Err(AdapterError::Validation(_))));

        let mut bad_price = intent(Side::Buy, OrderKind::Limit);
        bad_price.price = -1.0;
        assert!(matches!(normalize(&bad_price), Err(AdapterError::Validation(_))));
    }

    #[test]
    fn test_funding_selection_picks_first_qualifying() {
        let sources = vec![
            FundingSource { id: "w1".into(), currency: "BTC".into(), available: 0.5 },
            FundingSource { id: "w2".into(), currency: "USD".into(), available: 100.0 },
            FundingSource { id: "w3".into(), currency: "btc".into(), available: 2.0 },
            FundingSource { id: "w4".into(), currency: "BTC".into(), available: 5.0 },
        ];
        let chosen = select_funding_source(&sources, "BTC", 1.0).unwrap();
        assert_eq!(chosen.id, "w3");
    }

    #[test]
    fn test_funding_selection_reports_currency_and_amount() {
        let sources = vec![FundingSource { id: "w1".into(), currency: "BTC".into(), available: 0.5 }];
        match select_funding_source(&sources, "BTC", 1.0) {
            Err(AdapterError::InsufficientFunds { currency, amount }) => {
                assert_eq!(currency, "BTC");
                assert_eq!(amount, 1.0);
            }
            other => panic!("expected insufficient funds, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_numeric_id_prefixes() {
        assert_eq!(parse_numeric_id("12345", "order id").unwrap(), 12345);
        assert_eq!(parse_numeric_id("0x1f", "order id").unwrap(), 31);
        assert_eq!(parse_numeric_id("0o17", "order id").unwrap(), 15);
        assert_eq!(parse_numeric_id("-7", "order id").unwrap(), -7);
        assert!(matches!(
            parse_numeric_id("abc", "order id"),
            Err(AdapterError::Validation(_))
        ));
        assert!(parse_numeric_id("", "account id").is_err());
    }

    #[test]
    fn test_parse_numeric_id_full_i64_range() {
        assert_eq!(parse_numeric_id("-9223372036854775808", "order id").unwrap(), i64::MIN);
        assert_eq!(parse_numeric_id("9223372036854775807", "order id").unwrap(), i64::MAX);
        assert_eq!(parse_numeric_id("-0x8000000000000000", "order id").unwrap(), i64::MIN);
        assert!(parse_numeric_id("9223372036854775808", "order id").is_err());
        assert!(parse_numeric_id("--5", "order id").is_err());
        assert!(parse_numeric_id("0x-5", "order id").is_err());
    }

    #[test]
    fn test_lifecycle_transitions() {
        use OrderState::*;
        assert!(Requested.can_transition_to(Validated));
        assert!(Validated.can_transition_to(Funded));
        assert!(Validated.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(RejectedByVenue));
        assert!(!Requested.can_transition_to(Submitted));
        assert!(!RejectedInsufficientFunds.can_transition_to(Submitted));
        assert!(!Accepted.can_transition_to(Submitted));

        let mut lifecycle = OrderLifecycle::new("ITBIT", "ref");
        lifecycle.advance(Validated);
        lifecycle.advance(Funded);
        lifecycle.advance(Submitted);
        lifecycle.advance(Accepted);
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn test_placed_flag_is_authoritative() {
        let rejected = SubmitOrderResponse::from_venue(Some("abc".into()), false);
        assert_eq!(rejected.order_id, "abc");
        assert!(!rejected.placed);

        let accepted = SubmitOrderResponse::from_venue(None, true);
        assert!(accepted.order_id.is_empty());
        assert!(accepted.placed);
    }
}
