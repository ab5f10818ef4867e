//! Price Tick Types
//!
//! A tick is one price observation for the tracked symbol, regardless of
//! which source produced it. Ticks are immutable and only consumed for
//! display; there is no ordering guarantee between ticks from different
//! sources.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

// =============================================================================
// Symbol
// =============================================================================

/// Instrument identifier, normalised to upper case (e.g. `BTCUSDT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol, trimming whitespace and upper-casing it.
    #[must_use]
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_uppercase())
    }

    /// Upper-case form used by request/response lookups.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form used in stream subscription paths.
    #[must_use]
    pub fn stream_name(&self) -> String {
        self.0.to_lowercase()
    }

    /// Whether the symbol is empty after normalisation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Tick Source
// =============================================================================

/// Which source produced a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TickSource {
    /// Real-time push stream.
    Stream,
    /// Periodic request/response poll.
    Poll,
}

impl TickSource {
    /// Lowercase source name, used as a metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Poll => "poll",
        }
    }

    /// Upper-case tag used in rendered tick lines.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Stream => "STREAM",
            Self::Poll => "POLL",
        }
    }
}

// =============================================================================
// Price Tick
// =============================================================================

/// One price observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceTick {
    /// Instrument the price belongs to.
    pub symbol: Symbol,
    /// Observed price.
    pub price: Decimal,
    /// Traded quantity; only stream ticks carry one.
    pub quantity: Option<Decimal>,
    /// Observation time in Unix milliseconds.
    pub timestamp_millis: i64,
    /// Producing source.
    pub source: TickSource,
}

impl PriceTick {
    /// Tick from a streamed trade.
    #[must_use]
    pub const fn from_stream(
        symbol: Symbol,
        price: Decimal,
        quantity: Decimal,
        timestamp_millis: i64,
    ) -> Self {
        Self {
            symbol,
            price,
            quantity: Some(quantity),
            timestamp_millis,
            source: TickSource::Stream,
        }
    }

    /// Tick from a polled price, stamped at `observed_at`.
    #[must_use]
    pub fn from_poll(symbol: Symbol, price: Decimal, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol,
            price,
            quantity: None,
            timestamp_millis: observed_at.timestamp_millis(),
            source: TickSource::Poll,
        }
    }

    /// Observation time, if the millisecond value is representable.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_millis)
    }
}

impl std::fmt::Display for PriceTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} {}", self.source.tag(), self.symbol, self.price)?;
        if let Some(quantity) = self.quantity {
            write!(f, " | qty {quantity}")?;
        }
        match self.timestamp() {
            Some(ts) => write!(f, " | {}", ts.format("%H:%M:%S%.3f")),
            None => write!(f, " | t={}", self.timestamp_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn symbol_is_normalised() {
        let symbol = Symbol::new("  btcusdt ");
        assert_eq!(symbol.as_str(), "BTCUSDT");
        assert_eq!(symbol.stream_name(), "btcusdt");
        assert!(!symbol.is_empty());
        assert!(Symbol::new("   ").is_empty());
    }

    #[test]
    fn stream_tick_renders_quantity_and_time() {
        let tick = PriceTick::from_stream(
            Symbol::new("BTCUSDT"),
            Decimal::from_str("65000.50").unwrap(),
            Decimal::from_str("0.01").unwrap(),
            1_700_000_000_000,
        );

        assert_eq!(
            tick.to_string(),
            "[STREAM] BTCUSDT 65000.50 | qty 0.01 | 22:13:20.000"
        );
    }

    #[test]
    fn poll_tick_has_no_quantity() {
        let observed_at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let tick = PriceTick::from_poll(
            Symbol::new("BTCUSDT"),
            Decimal::from_str("65010.25").unwrap(),
            observed_at,
        );

        assert_eq!(tick.source, TickSource::Poll);
        assert_eq!(tick.quantity, None);
        assert_eq!(tick.timestamp_millis, 1_700_000_000_123);
        assert_eq!(tick.to_string(), "[POLL] BTCUSDT 65010.25 | 22:13:20.123");
    }

    #[test]
    fn out_of_range_timestamp_renders_raw() {
        let tick = PriceTick::from_stream(Symbol::new("X"), Decimal::ONE, Decimal::ONE, i64::MAX);
        assert!(tick.timestamp().is_none());
        assert!(tick.to_string().ends_with(&format!("t={}", i64::MAX)));
    }

    #[test]
    fn source_labels() {
        assert_eq!(TickSource::Stream.as_str(), "stream");
        assert_eq!(TickSource::Poll.as_str(), "poll");
        assert_eq!(TickSource::Stream.tag(), "STREAM");
    }
}
