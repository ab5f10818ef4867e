//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ticks**: Price observations delivered, by source
//! - **Transitions**: Upgrades and downgrades of the active source
//! - **Failures**: Stream parse failures, poll fetch failures, escalations
//! - **State**: Current connection state as a gauge
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! before `init_metrics` is a no-op.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::{ConnectionState, TickSource, Transition};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle installed by the first call.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed, for example when
/// another global recorder is already present.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

const TICKS_TOTAL: &str = "price_fallback_ticks_total";
const TRANSITIONS_TOTAL: &str = "price_fallback_transitions_total";
const STREAM_PARSE_FAILURES_TOTAL: &str = "price_fallback_stream_parse_failures_total";
const POLL_FAILURES_TOTAL: &str = "price_fallback_poll_failures_total";
const MALFORMED_ESCALATIONS_TOTAL: &str = "price_fallback_malformed_escalations_total";
const CONNECTION_STATE: &str = "price_fallback_connection_state";

fn register_metrics() {
    describe_counter!(TICKS_TOTAL, "Total price ticks delivered, by source");
    describe_counter!(
        TRANSITIONS_TOTAL,
        "Total source transitions (upgrade, downgrade)"
    );
    describe_counter!(
        STREAM_PARSE_FAILURES_TOTAL,
        "Total stream messages dropped because they failed to decode"
    );
    describe_counter!(POLL_FAILURES_TOTAL, "Total failed poll fetches, by kind");
    describe_counter!(
        MALFORMED_ESCALATIONS_TOTAL,
        "Times a run of malformed payloads reached the escalation threshold"
    );
    describe_gauge!(
        CONNECTION_STATE,
        "Connection state (0 = disconnected, 1 = streaming, 2 = polling)"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a tick delivered to the sink.
pub fn record_tick(source: TickSource) {
    counter!(TICKS_TOTAL, "source" => source.as_str()).increment(1);
}

/// Record a source transition.
pub fn record_transition(transition: Transition) {
    counter!(TRANSITIONS_TOTAL, "kind" => transition.as_str()).increment(1);
}

/// Record a stream message that failed to decode.
pub fn record_stream_parse_failure() {
    counter!(STREAM_PARSE_FAILURES_TOTAL).increment(1);
}

/// Record a failed poll fetch.
pub fn record_poll_failure(kind: &'static str) {
    counter!(POLL_FAILURES_TOTAL, "kind" => kind).increment(1);
}

/// Record an escalated run of malformed payloads.
pub fn record_malformed_escalation(source: TickSource) {
    counter!(MALFORMED_ESCALATIONS_TOTAL, "source" => source.as_str()).increment(1);
}

/// Update the connection state gauge.
pub fn set_connection_state(state: ConnectionState) {
    gauge!(CONNECTION_STATE).set(state.as_gauge());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        record_tick(TickSource::Stream);
        record_transition(Transition::Downgrade);
        record_stream_parse_failure();
        record_poll_failure("network");
        record_malformed_escalation(TickSource::Poll);
        set_connection_state(ConnectionState::Polling);
    }

    #[test]
    fn state_gauge_encoding() {
        assert!((ConnectionState::Disconnected.as_gauge() - 0.0).abs() < f64::EPSILON);
        assert!((ConnectionState::Streaming.as_gauge() - 1.0).abs() < f64::EPSILON);
        assert!((ConnectionState::Polling.as_gauge() - 2.0).abs() < f64::EPSILON);
    }
}
