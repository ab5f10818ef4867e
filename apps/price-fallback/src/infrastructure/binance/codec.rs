//! Trade Codec
//!
//! Decodes Binance trade stream text frames into price ticks. A frame that
//! fails here is dropped by the supervisor; the connection stays open.

use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;

use super::messages::TradeMessage;
use crate::domain::{PriceTick, Symbol};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON decoding failed or a required field is missing.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Price is not a positive decimal.
    #[error("invalid price: {0:?}")]
    InvalidPrice(String),

    /// Quantity is not a non-negative decimal.
    #[error("invalid quantity: {0:?}")]
    InvalidQuantity(String),

    /// Trade time is outside the representable range.
    #[error("invalid trade time: {0}")]
    InvalidTimestamp(i64),

    /// Event is not a trade.
    #[error("unexpected event type: {0}")]
    UnexpectedEvent(String),

    /// Trade belongs to a different symbol.
    #[error("unexpected symbol: {0}")]
    UnexpectedSymbol(String),
}

/// JSON codec for a single-symbol trade stream.
#[derive(Debug, Clone)]
pub struct TradeCodec {
    symbol: Symbol,
}

impl TradeCodec {
    /// Create a codec that accepts trades for `symbol`.
    #[must_use]
    pub const fn new(symbol: Symbol) -> Self {
        Self { symbol }
    }

    /// Decode one text frame into a stream tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid, a field is missing or
    /// non-numeric, or the frame is not a trade for this codec's symbol.
    pub fn decode(&self, text: &str) -> Result<PriceTick, CodecError> {
        let msg: TradeMessage = serde_json::from_str(text.trim())?;

        if let Some(event_type) = msg.event_type.as_deref()
            && event_type != "trade"
        {
            return Err(CodecError::UnexpectedEvent(event_type.to_string()));
        }

        if let Some(symbol) = msg.symbol.as_deref()
            && !symbol.eq_ignore_ascii_case(self.symbol.as_str())
        {
            return Err(CodecError::UnexpectedSymbol(symbol.to_string()));
        }

        let price = Decimal::from_str(msg.price.trim())
            .ok()
            .filter(|p| p.is_sign_positive() && !p.is_zero())
            .ok_or_else(|| CodecError::InvalidPrice(msg.price.clone()))?;

        let quantity = Decimal::from_str(msg.quantity.trim())
            .ok()
            .filter(|q| !q.is_sign_negative())
            .ok_or_else(|| CodecError::InvalidQuantity(msg.quantity.clone()))?;

        if DateTime::from_timestamp_millis(msg.trade_time).is_none() {
            return Err(CodecError::InvalidTimestamp(msg.trade_time));
        }

        Ok(PriceTick::from_stream(
            self.symbol.clone(),
            price,
            quantity,
            msg.trade_time,
        ))
    }
}
