//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `StreamSource`: Persistent push connection delivering decoded trades
//! - `PriceFetcher`: Request/response lookup of the current price
//! - `TickSink`: Display sink for price ticks

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{PriceTick, Symbol};

// =============================================================================
// Stream Source
// =============================================================================

/// Events emitted by a stream source over one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Connection established. Emitted at most once, before any message.
    Opened,
    /// A trade message decoded into a tick.
    Tick(PriceTick),
    /// A message that failed to decode; the connection stays open.
    Malformed(String),
    /// Transport error. May be followed by `Closed`.
    Error(String),
    /// Connection ended. Emitted exactly once; nothing follows it.
    Closed,
}

/// A push-based market data connection for a single symbol.
///
/// `run` drives one connection attempt to completion. Implementations must
/// emit `Closed` exactly once before returning, including when connecting
/// fails and when `close` is cancelled.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Connect, forward events, and return once the connection has ended.
    async fn run(&self, events: mpsc::Sender<StreamEvent>, close: CancellationToken);
}

// =============================================================================
// Price Fetcher
// =============================================================================

/// Errors from a single price fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Request could not be sent or the response could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// Endpoint answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Response body did not contain a usable price.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether retrying on the next schedule is likely to succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) => false,
        }
    }

    /// Short label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Request/response lookup of the current price for a symbol.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Fetch the latest price.
    async fn fetch_price(&self, symbol: &Symbol) -> Result<Decimal, FetchError>;
}

// =============================================================================
// Tick Sink
// =============================================================================

/// Display sink receiving every tick the supervisor forwards.
pub trait TickSink: Send + Sync {
    /// Publish one tick.
    fn publish(&self, tick: &PriceTick);
}
