//! Supervisor Status
//!
//! Read-only view of the supervisor shared with the health endpoint.
//! Only the supervisor writes to it.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::domain::{ConnectionState, Symbol, TickSource};

/// Shared connection status and counters.
#[derive(Debug)]
pub struct SupervisorStatus {
    symbol: Symbol,
    state: parking_lot::RwLock<ConnectionState>,
    last_transition_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    stream_ticks: AtomicU64,
    poll_ticks: AtomicU64,
    poll_failures: AtomicU64,
    parse_failures: AtomicU64,
    stream_escalations: AtomicU64,
    poll_escalations: AtomicU64,
}

impl SupervisorStatus {
    /// Create a status for `symbol` in the disconnected state.
    #[must_use]
    pub const fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            state: parking_lot::RwLock::new(ConnectionState::Disconnected),
            last_transition_at: parking_lot::RwLock::new(None),
            stream_ticks: AtomicU64::new(0),
            poll_ticks: AtomicU64::new(0),
            poll_failures: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            stream_escalations: AtomicU64::new(0),
            poll_escalations: AtomicU64::new(0),
        }
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        *self.last_transition_at.write() = Some(Utc::now());
    }

    pub(crate) fn record_tick(&self, source: TickSource) {
        let counter = match source {
            TickSource::Stream => &self.stream_ticks,
            TickSource::Poll => &self.poll_ticks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_poll_failure(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed_escalation(&self, source: TickSource) {
        let counter = match source {
            TickSource::Stream => &self.stream_escalations,
            TickSource::Poll => &self.poll_escalations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Tracked symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// When the state last changed.
    #[must_use]
    pub fn last_transition_at(&self) -> Option<DateTime<Utc>> {
        *self.last_transition_at.read()
    }

    /// Ticks delivered from the given source.
    #[must_use]
    pub fn ticks(&self, source: TickSource) -> u64 {
        match source {
            TickSource::Stream => self.stream_ticks.load(Ordering::Relaxed),
            TickSource::Poll => self.poll_ticks.load(Ordering::Relaxed),
        }
    }

    /// Failed poll fetches.
    #[must_use]
    pub fn poll_failures(&self) -> u64 {
        self.poll_failures.load(Ordering::Relaxed)
    }

    /// Stream messages dropped because they failed to decode.
    #[must_use]
    pub fn parse_failures(&self) -> u64 {
        self.parse_failures.load(Ordering::Relaxed)
    }

    /// Runs of malformed payloads from the given source that reached the
    /// escalation threshold.
    #[must_use]
    pub fn malformed_escalations(&self, source: TickSource) -> u64 {
        match source {
            TickSource::Stream => self.stream_escalations.load(Ordering::Relaxed),
            TickSource::Poll => self.poll_escalations.load(Ordering::Relaxed),
        }
    }
}
