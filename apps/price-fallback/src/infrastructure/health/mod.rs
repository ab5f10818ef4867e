//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, source status reporting, and Prometheus metrics.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (ready while a source is active)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::SupervisorStatus;
use crate::domain::{ConnectionState, TickSource};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Active price source.
    pub source: SourceInfo,
    /// Delivery and failure counters.
    pub counters: CounterInfo,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Real-time stream active.
    Healthy,
    /// Serving from the polling fallback.
    Degraded,
    /// No source active.
    Unhealthy,
}

/// Active source details.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    /// Tracked symbol.
    pub symbol: String,
    /// Connection state.
    pub state: ConnectionState,
    /// Time of the last state change.
    pub last_transition_at: Option<DateTime<Utc>>,
}

/// Counters since start.
#[derive(Debug, Clone, Serialize)]
pub struct CounterInfo {
    /// Ticks delivered from the stream.
    pub stream_ticks: u64,
    /// Ticks delivered from polling.
    pub poll_ticks: u64,
    /// Failed poll fetches.
    pub poll_failures: u64,
    /// Stream messages dropped as malformed.
    pub parse_failures: u64,
    /// Escalated runs of malformed payloads, both sources.
    pub malformed_escalations: u64,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    status: Arc<SupervisorStatus>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String, status: Arc<SupervisorStatus>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            status,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Routes served by the health server.
    #[must_use]
    pub fn router(state: Arc<HealthServerState>) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = Self::router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.status.state().is_active() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let status = &state.status;
    let connection_state = status.state();

    HealthResponse {
        status: determine_health_status(connection_state),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        source: SourceInfo {
            symbol: status.symbol().to_string(),
            state: connection_state,
            last_transition_at: status.last_transition_at(),
        },
        counters: CounterInfo {
            stream_ticks: status.ticks(TickSource::Stream),
            poll_ticks: status.ticks(TickSource::Poll),
            poll_failures: status.poll_failures(),
            parse_failures: status.parse_failures(),
            malformed_escalations: status.malformed_escalations(TickSource::Stream)
                + status.malformed_escalations(TickSource::Poll),
        },
    }
}

const fn determine_health_status(state: ConnectionState) -> HealthStatus {
    match state {
        ConnectionState::Streaming => HealthStatus::Healthy,
        ConnectionState::Polling => HealthStatus::Degraded,
        ConnectionState::Disconnected => HealthStatus::Unhealthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
