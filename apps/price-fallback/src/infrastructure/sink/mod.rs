//! Console Tick Sink
//!
//! Writes one log line per tick through `tracing`, carrying the tick as
//! structured fields alongside the rendered line.

use crate::application::ports::TickSink;
use crate::domain::PriceTick;

/// Target used for tick lines, so they can be filtered independently.
pub const TICK_LOG_TARGET: &str = "price_fallback::ticks";

/// Tick sink that logs every tick at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Create a new console sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TickSink for ConsoleSink {
    fn publish(&self, tick: &PriceTick) {
        tracing::info!(
            target: TICK_LOG_TARGET,
            source = tick.source.as_str(),
            symbol = %tick.symbol,
            price = %tick.price,
            quantity = ?tick.quantity,
            time = tick.timestamp_millis,
            "{tick}"
        );
    }
}
