//! Binance Wire Message Types
//!
//! Wire format types for the Binance trade stream and the REST price
//! ticker. Prices and quantities arrive as string-encoded decimals.
//!
//! # References
//!
//! - [Trade Streams](https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#trade-streams)
//! - [Symbol Price Ticker](https://developers.binance.com/docs/binance-spot-api-docs/rest-api/market-data-endpoints#symbol-price-ticker)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw trade event from `<symbol>@trade`.
///
/// Numeric fields stay as strings here; the codec validates them so a bad
/// price can be reported separately from bad JSON.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "e": "trade",
///   "E": 1700000000005,
///   "s": "BTCUSDT",
///   "t": 3258123456,
///   "p": "65000.50",
///   "q": "0.01",
///   "T": 1700000000000,
///   "m": true,
///   "M": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMessage {
    /// Event type (always "trade")
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// Symbol
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    /// Trade price
    #[serde(rename = "p")]
    pub price: String,

    /// Trade quantity
    #[serde(rename = "q")]
    pub quantity: String,

    /// Trade time (Unix milliseconds)
    #[serde(rename = "T")]
    pub trade_time: i64,
}

/// Response of `GET /api/v3/ticker/price?symbol=<SYMBOL>`.
///
/// # Wire Format (JSON)
/// ```json
/// {"symbol": "BTCUSDT", "price": "65010.25"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerPriceResponse {
    /// Symbol
    #[serde(default)]
    pub symbol: String,

    /// Latest price
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn trade_message_ignores_unknown_fields() {
        let json = r#"{"e":"trade","E":1,"s":"BTCUSDT","t":7,"p":"65000.50","q":"0.01","T":1700000000000,"m":true,"M":true}"#;
        let msg: TradeMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg.event_type.as_deref(), Some("trade"));
        assert_eq!(msg.symbol.as_deref(), Some("BTCUSDT"));
        assert_eq!(msg.price, "65000.50");
        assert_eq!(msg.quantity, "0.01");
        assert_eq!(msg.trade_time, 1_700_000_000_000);
    }

    #[test]
    fn trade_message_requires_price() {
        let json = r#"{"q":"0.01","T":1700000000000}"#;
        assert!(serde_json::from_str::<TradeMessage>(json).is_err());
    }

    #[test]
    fn ticker_response_parses_string_price() {
        let json = r#"{"symbol":"BTCUSDT","price":"65010.25"}"#;
        let resp: TickerPriceResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.price, Decimal::from_str("65010.25").unwrap());
    }

    #[test]
    fn ticker_response_rejects_non_numeric_price() {
        let json = r#"{"symbol":"BTCUSDT","price":"n/a"}"#;
        assert!(serde_json::from_str::<TickerPriceResponse>(json).is_err());
    }
}
