//! Connection State Types
//!
//! The fallback state machine's states and the transitions between them.
//!
//! ```text
//!                 start                 close / error
//! Disconnected ──────────► Streaming ──────────────────► Polling
//!      ▲                       │                            │
//!      └───────────────────────┴──── shutdown ──────────────┘
//! ```
//!
//! There is no edge from `Polling` back to `Streaming`: once degraded, the
//! feed stays on polling until shutdown.

use serde::Serialize;

// =============================================================================
// Connection State
// =============================================================================

/// Which data source is currently feeding prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No source is active.
    #[default]
    Disconnected,
    /// The real-time stream is the active source.
    Streaming,
    /// The periodic poller is the active source.
    Polling,
}

impl ConnectionState {
    /// Whether the state machine permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Streaming)
                | (Self::Streaming, Self::Polling)
                | (Self::Streaming | Self::Polling, Self::Disconnected)
        )
    }

    /// The kind of move `self -> next` represents, if it changes the source.
    #[must_use]
    pub const fn transition_to(self, next: Self) -> Option<Transition> {
        match (self, next) {
            (Self::Disconnected | Self::Polling, Self::Streaming) => Some(Transition::Upgrade),
            (Self::Streaming, Self::Polling) => Some(Transition::Downgrade),
            _ => None,
        }
    }

    /// Whether some source is feeding prices.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Streaming => "streaming",
            Self::Polling => "polling",
        }
    }

    /// Numeric encoding used by the connection state gauge.
    #[must_use]
    pub const fn as_gauge(self) -> f64 {
        match self {
            Self::Disconnected => 0.0,
            Self::Streaming => 1.0,
            Self::Polling => 2.0,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transition
// =============================================================================

/// Direction of a source change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Moving to the real-time stream.
    Upgrade,
    /// Falling back from the stream to polling.
    Downgrade,
}

impl Transition {
    /// Lowercase transition name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upgrade => "upgrade",
            Self::Downgrade => "downgrade",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const ALL: [ConnectionState; 3] = [
        ConnectionState::Disconnected,
        ConnectionState::Streaming,
        ConnectionState::Polling,
    ];

    #[test]
    fn default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn allowed_transitions() {
        use ConnectionState::{Disconnected, Polling, Streaming};

        assert!(Disconnected.can_transition_to(Streaming));
        assert!(Streaming.can_transition_to(Polling));
        assert!(Streaming.can_transition_to(Disconnected));
        assert!(Polling.can_transition_to(Disconnected));
    }

    #[test]
    fn polling_never_upgrades() {
        assert!(!ConnectionState::Polling.can_transition_to(ConnectionState::Streaming));
    }

    #[test]
    fn disconnected_cannot_poll_directly() {
        assert!(!ConnectionState::Disconnected.can_transition_to(ConnectionState::Polling));
    }

    #[test]
    fn transition_kinds() {
        assert_eq!(
            ConnectionState::Disconnected.transition_to(ConnectionState::Streaming),
            Some(Transition::Upgrade)
        );
        assert_eq!(
            ConnectionState::Streaming.transition_to(ConnectionState::Polling),
            Some(Transition::Downgrade)
        );
        assert_eq!(
            ConnectionState::Polling.transition_to(ConnectionState::Disconnected),
            None
        );
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::Polling).unwrap(),
            "\"polling\""
        );
    }

    proptest! {
        #[test]
        fn no_self_transitions(idx in 0usize..3) {
            let state = ALL[idx];
            prop_assert!(!state.can_transition_to(state));
        }

        #[test]
        fn streaming_is_only_entered_from_disconnected(steps in proptest::collection::vec(0usize..3, 0..32)) {
            let mut state = ConnectionState::Disconnected;
            for idx in steps {
                let next = ALL[idx];
                if state.can_transition_to(next) {
                    if next == ConnectionState::Streaming {
                        prop_assert_eq!(state, ConnectionState::Disconnected);
                    }
                    if next == ConnectionState::Polling {
                        prop_assert_eq!(state, ConnectionState::Streaming);
                    }
                    state = next;
                }
            }
        }
    }
}
