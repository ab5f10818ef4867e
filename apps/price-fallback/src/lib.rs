#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Price Fallback - Streaming Price Feed with Polling Fallback
//!
//! Tracks the last traded price of one instrument. Prefers a real-time
//! WebSocket trade stream and, once the stream closes or fails, falls back
//! to polling a REST price endpoint for the rest of the run.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `connection`: Connection state and allowed transitions
//!   - `tick`: Price ticks, symbols, and tick sources
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Stream source, price fetcher, and tick sink interfaces
//!   - `services`: Connection supervisor, poll timer, shared status
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `binance`: WebSocket trade stream and REST price ticker
//!   - `sink`: Console tick output
//!   - `config`: Environment configuration
//!   - `health`: Health check HTTP endpoint
//!   - `metrics`, `telemetry`: Observability
//!
//! # Data Flow
//!
//! ```text
//! Trade stream (WS) ──► ┌──────────────────────┐
//!                       │ ConnectionSupervisor │ ──► TickSink
//! Ticker poll (REST) ─► └──────────────────────┘
//!                        one source at a time
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core price feed types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::{ConnectionState, PriceTick, Symbol, TickSource, Transition};

// Ports
pub use application::ports::{
    FetchError, PriceFetcher, StreamEvent, StreamSource, TickSink,
};

// Services
pub use application::services::{
    ConnectionSupervisor, PollEvent, PollSource, PollTimerHandle, SupervisorConfig,
    SupervisorError, SupervisorStatus,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, FallbackConfig};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
