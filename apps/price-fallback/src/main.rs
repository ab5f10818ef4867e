//! Price Fallback Binary
//!
//! Streams trades for one symbol and falls back to polling when the stream
//! ends.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin price-fallback
//! ```
//!
//! # Environment Variables
//!
//! All optional.
//! - `FALLBACK_SYMBOL`: Instrument to track (default: BTCUSDT)
//! - `FALLBACK_STREAM_ENDPOINT`: WebSocket base URL (default: <wss://stream.binance.com:9443/ws>)
//! - `FALLBACK_POLL_ENDPOINT`: REST price URL (default: <https://api.binance.com/api/v3/ticker/price>)
//! - `FALLBACK_POLL_INTERVAL_MS`: Polling period (default: 3000)
//! - `FALLBACK_HTTP_TIMEOUT_MS`: Per-fetch timeout (default: 5000)
//! - `FALLBACK_DEMO_CLOSE_AFTER_MS`: Forced stream close after open, 0 disables (default: 1000)
//! - `FALLBACK_MALFORMED_ESCALATION`: Malformed payloads before escalation, 0 disables (default: 5)
//! - `FALLBACK_HEALTH_PORT`: Health check HTTP port, 0 disables (default: 8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: price-fallback)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use price_fallback::infrastructure::binance::{
    BinanceTickerClient, BinanceTradeStream, TradeStreamConfig,
};
use price_fallback::infrastructure::health::{HealthServer, HealthServerState};
use price_fallback::infrastructure::sink::ConsoleSink;
use price_fallback::infrastructure::telemetry;
use price_fallback::{ConnectionSupervisor, FallbackConfig, PollSource, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err("failed to install rustls crypto provider".into());
    }

    load_dotenv();

    // Initialize telemetry (tracing + optional OpenTelemetry)
    let _telemetry_guard = telemetry::init()?;

    tracing::info!("Starting price fallback");

    // Initialize Prometheus metrics
    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Metrics recorder unavailable");
    }

    let config = FallbackConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Sources and sink
    let stream = Arc::new(BinanceTradeStream::new(TradeStreamConfig::new(
        config.endpoints.stream.clone(),
        config.symbol.clone(),
    )));
    let fetcher = Arc::new(BinanceTickerClient::new(
        config.endpoints.poll.clone(),
        config.timing.http_timeout,
    )?);
    let poll_source = PollSource::new(fetcher, config.symbol.clone(), config.timing.poll_interval);

    let supervisor = ConnectionSupervisor::new(
        config.supervisor_config(),
        config.symbol.clone(),
        stream,
        poll_source,
        Arc::new(ConsoleSink::new()),
    );

    // Spawn health server
    if config.health_port != 0 {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            supervisor.status(),
        ));
        let health_server =
            HealthServer::new(config.health_port, health_state, shutdown_token.clone());
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    // Spawn supervisor
    let supervisor_shutdown = shutdown_token.clone();
    let supervisor_task = tokio::spawn(async move {
        if let Err(e) = supervisor.run(supervisor_shutdown).await {
            tracing::error!(error = %e, "Supervisor error");
        }
    });

    tracing::info!(symbol = %config.symbol, "Price fallback ready");

    await_shutdown(shutdown_token).await;

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, supervisor_task)
        .await
        .is_err()
    {
        tracing::warn!("Supervisor did not stop within shutdown timeout");
    }

    tracing::info!("Price fallback stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &FallbackConfig) {
    tracing::info!(
        symbol = %config.symbol,
        poll_interval_ms = u64::try_from(config.timing.poll_interval.as_millis()).unwrap_or(u64::MAX),
        demo_close_after_ms = ?config.timing.demo_close_after.map(|d| d.as_millis()),
        malformed_escalation = config.malformed_escalation,
        health_port = config.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        stream_endpoint = %config.endpoints.stream,
        poll_endpoint = %config.endpoints.poll,
        "Upstream endpoints"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
