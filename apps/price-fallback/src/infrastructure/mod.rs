//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Binance trade stream and price ticker adapters.
pub mod binance;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Console tick output.
pub mod sink;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
