//! Connection Supervisor
//!
//! Owns the fallback state machine. Starts on the real-time stream and,
//! on the first close or error, tears the stream down and falls back to
//! periodic polling for the rest of the run.
//!
//! All state lives on the task that drives [`ConnectionSupervisor::run`]
//! (or [`ConnectionSupervisor::step`]). Sources report over channels that
//! the supervisor owns; dropping a source's handle discards anything it
//! has not yet delivered.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::poller::{PollEvent, PollSource, PollTimerHandle};
use super::status::SupervisorStatus;
use crate::application::ports::{FetchError, StreamEvent, StreamSource, TickSink};
use crate::domain::{ConnectionState, PriceTick, Symbol, TickSource, Transition};
use crate::infrastructure::metrics;

/// Buffered stream events between the stream task and the supervisor.
const STREAM_EVENT_CAPACITY: usize = 1024;

// =============================================================================
// Error Type
// =============================================================================

/// Errors returned by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    /// `start` was called when the supervisor was already running.
    #[error("supervisor already started (state: {0})")]
    AlreadyStarted(ConnectionState),
}

// =============================================================================
// Configuration
// =============================================================================

/// Supervisor behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Close the stream this long after it opens to exercise the downgrade
    /// path. `None` disables the forced close.
    pub demo_close_after: Option<Duration>,
    /// Consecutive malformed payloads from one source before the problem is
    /// escalated. Zero disables escalation.
    pub malformed_escalation_threshold: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            demo_close_after: None,
            malformed_escalation_threshold: 5,
        }
    }
}

// =============================================================================
// Internal Types
// =============================================================================

/// Ownership of the live stream connection.
struct StreamHandle {
    close: CancellationToken,
    task: JoinHandle<()>,
    events: mpsc::Receiver<StreamEvent>,
    opened: bool,
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close.cancel();
        self.task.abort();
        self.events.close();
    }
}

#[derive(Debug, Default)]
struct MalformedStreak {
    count: u32,
}

impl MalformedStreak {
    /// Count one malformed payload. Returns true exactly when the streak
    /// reaches `threshold`.
    fn record(&mut self, threshold: u32) -> bool {
        self.count = self.count.saturating_add(1);
        threshold > 0 && self.count == threshold
    }

    const fn reset(&mut self) {
        self.count = 0;
    }
}

enum Input {
    Stream(StreamEvent),
    Poll(PollEvent),
    PollTimerEnded,
    DemoCloseDue,
}

// =============================================================================
// Connection Supervisor
// =============================================================================

/// Fallback state machine over a stream source and a poll source.
///
/// At most one of {stream connection, poll timer} exists at any time.
pub struct ConnectionSupervisor {
    config: SupervisorConfig,
    stream_source: Arc<dyn StreamSource>,
    poll_source: PollSource,
    sink: Arc<dyn TickSink>,
    state: ConnectionState,
    stream: Option<StreamHandle>,
    poll: Option<PollTimerHandle>,
    demo_close_at: Option<Instant>,
    stream_malformed: MalformedStreak,
    poll_malformed: MalformedStreak,
    status: Arc<SupervisorStatus>,
}

impl ConnectionSupervisor {
    /// Create a supervisor in the disconnected state.
    #[must_use]
    pub fn new(
        config: SupervisorConfig,
        symbol: Symbol,
        stream_source: Arc<dyn StreamSource>,
        poll_source: PollSource,
        sink: Arc<dyn TickSink>,
    ) -> Self {
        Self {
            config,
            stream_source,
            poll_source,
            sink,
            state: ConnectionState::Disconnected,
            stream: None,
            poll: None,
            demo_close_at: None,
            stream_malformed: MalformedStreak::default(),
            poll_malformed: MalformedStreak::default(),
            status: Arc::new(SupervisorStatus::new(symbol)),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Shared status view for health reporting.
    #[must_use]
    pub fn status(&self) -> Arc<SupervisorStatus> {
        Arc::clone(&self.status)
    }

    /// Whether a stream connection is held.
    #[must_use]
    pub const fn is_stream_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether a poll timer is held.
    #[must_use]
    pub const fn is_polling_active(&self) -> bool {
        self.poll.is_some()
    }

    /// Open the stream source. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyStarted` if the supervisor is not disconnected; no
    /// second source is created in that case.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if self.state != ConnectionState::Disconnected {
            return Err(SupervisorError::AlreadyStarted(self.state));
        }

        self.open_stream();
        self.transition(ConnectionState::Streaming, "start");
        Ok(())
    }

    /// Ask the stream to close, as the forced-close timer would.
    ///
    /// Returns `false` if there is no stream or a close is already pending.
    /// The downgrade itself happens when the source reports `Closed`.
    pub fn force_stream_close(&mut self) -> bool {
        match &self.stream {
            Some(stream) if !stream.close.is_cancelled() => {
                stream.close.cancel();
                true
            }
            _ => false,
        }
    }

    /// Stop every source and return to disconnected.
    pub fn shutdown(&mut self) {
        self.demo_close_at = None;
        self.stream = None;
        self.poll = None;
        if self.state != ConnectionState::Disconnected {
            self.transition(ConnectionState::Disconnected, "shutdown");
        }
    }

    /// Wait for the next input and handle it.
    ///
    /// Returns `false` without waiting when the supervisor is disconnected.
    pub async fn step(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }

        let input = self.next_input().await;
        self.dispatch(input);
        true
    }

    /// Start and process inputs until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyStarted` if the supervisor was started before.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), SupervisorError> {
        self.start()?;

        loop {
            let input = tokio::select! {
                () = shutdown.cancelled() => None,
                input = self.next_input() => Some(input),
            };

            match input {
                Some(input) => self.dispatch(input),
                None => {
                    tracing::info!("Supervisor shutting down");
                    self.shutdown();
                    return Ok(());
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Input handling
    // -------------------------------------------------------------------------

    async fn next_input(&mut self) -> Input {
        let demo_close_at = self.demo_close_at;
        let stream = self.stream.as_mut().map(|s| &mut s.events);
        let poll = self.poll.as_mut();

        tokio::select! {
            biased;

            // A stream channel that ends without `Closed` means the source task died.
            event = recv_or_pending(stream) => Input::Stream(event.unwrap_or(StreamEvent::Closed)),
            event = recv_poll_or_pending(poll) => event.map_or(Input::PollTimerEnded, Input::Poll),
            () = sleep_until_or_pending(demo_close_at) => Input::DemoCloseDue,
        }
    }

    fn dispatch(&mut self, input: Input) {
        match input {
            Input::Stream(event) => self.on_stream_event(event),
            Input::Poll(event) => self.on_poll_event(event),
            Input::PollTimerEnded => self.on_poll_timer_ended(),
            Input::DemoCloseDue => self.on_demo_close_due(),
        }
    }

    fn on_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Opened => self.on_stream_opened(),
            StreamEvent::Tick(tick) => {
                if self.state != ConnectionState::Streaming {
                    tracing::debug!(state = %self.state, "Dropping stream tick outside streaming");
                    return;
                }
                self.stream_malformed.reset();
                self.deliver(&tick);
            }
            StreamEvent::Malformed(reason) => {
                tracing::warn!(error = %reason, "Dropping malformed stream message");
                self.status.record_parse_failure();
                metrics::record_stream_parse_failure();
                if self
                    .stream_malformed
                    .record(self.config.malformed_escalation_threshold)
                {
                    self.escalate_malformed(TickSource::Stream);
                }
            }
            StreamEvent::Error(message) => {
                tracing::error!(error = %message, "Stream error");
                self.downgrade("stream error");
            }
            StreamEvent::Closed => {
                tracing::info!("Stream closed");
                self.downgrade("stream closed");
            }
        }
    }

    fn on_stream_opened(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        stream.opened = true;

        tracing::info!(symbol = %self.status.symbol(), "Stream connected, real-time streaming active");

        if let Some(poll) = self.poll.take() {
            poll.stop();
            tracing::debug!("Stopped poll timer on stream open");
        }

        if let Some(delay) = self.config.demo_close_after {
            self.demo_close_at = Some(Instant::now() + delay);
        }
    }

    fn on_poll_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Tick(tick) => {
                self.poll_malformed.reset();
                self.deliver(&tick);
            }
            PollEvent::Failed(error) => {
                self.status.record_poll_failure();
                metrics::record_poll_failure(error.kind());

                if error.is_transient() {
                    tracing::warn!(error = %error, "Poll fetch failed, retrying on schedule");
                } else {
                    tracing::warn!(error = %error, kind = error.kind(), "Poll fetch rejected");
                }

                if matches!(error, FetchError::Malformed(_))
                    && self
                        .poll_malformed
                        .record(self.config.malformed_escalation_threshold)
                {
                    self.escalate_malformed(TickSource::Poll);
                }
            }
        }
    }

    fn on_poll_timer_ended(&mut self) {
        self.poll = None;
        if self.state != ConnectionState::Polling {
            return;
        }

        let interval = self.poll_source.interval();
        tracing::error!(
            retry_in_ms = interval.as_millis(),
            "Poll timer stopped unexpectedly, restarting after one period"
        );
        self.poll = Some(self.poll_source.start_delayed());
    }

    fn on_demo_close_due(&mut self) {
        self.demo_close_at = None;
        if self.stream.as_ref().is_some_and(|s| s.opened) {
            tracing::info!("Simulating connection loss");
            self.force_stream_close();
        }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    fn open_stream(&mut self) {
        let (event_tx, events) = mpsc::channel(STREAM_EVENT_CAPACITY);
        let close = CancellationToken::new();

        let source = Arc::clone(&self.stream_source);
        let token = close.clone();
        let task = tokio::spawn(async move {
            source.run(event_tx, token).await;
        });

        self.stream = Some(StreamHandle {
            close,
            task,
            events,
            opened: false,
        });
    }

    /// Tear down the stream and fall back to polling. The first of
    /// {close, error} wins; later termination events are ignored.
    fn downgrade(&mut self, reason: &'static str) {
        if self.state != ConnectionState::Streaming {
            tracing::debug!(reason, state = %self.state, "Ignoring redundant stream termination");
            return;
        }

        self.demo_close_at = None;
        self.stream = None;
        self.transition(ConnectionState::Polling, reason);
        self.ensure_polling();
    }

    fn ensure_polling(&mut self) {
        if self.poll.is_some() {
            tracing::debug!("Poll timer already running");
            return;
        }
        self.poll = Some(self.poll_source.start());
    }

    fn transition(&mut self, next: ConnectionState, reason: &'static str) {
        let previous = self.state;
        if !previous.can_transition_to(next) {
            tracing::warn!(from = %previous, to = %next, reason, "Rejected state transition");
            return;
        }

        self.state = next;
        self.status.set_state(next);
        metrics::set_connection_state(next);

        match previous.transition_to(next) {
            Some(Transition::Upgrade) => {
                metrics::record_transition(Transition::Upgrade);
                tracing::info!(from = %previous, to = %next, reason, "UPGRADE: attempting stream connection");
            }
            Some(Transition::Downgrade) => {
                metrics::record_transition(Transition::Downgrade);
                tracing::warn!(from = %previous, to = %next, reason, "DOWNGRADE: falling back to polling");
            }
            None => {
                tracing::info!(from = %previous, to = %next, reason, "State changed");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    fn deliver(&self, tick: &PriceTick) {
        self.status.record_tick(tick.source);
        metrics::record_tick(tick.source);
        self.sink.publish(tick);
    }

    fn escalate_malformed(&self, source: TickSource) {
        self.status.record_malformed_escalation(source);
        metrics::record_malformed_escalation(source);
        tracing::error!(
            source = source.as_str(),
            threshold = self.config.malformed_escalation_threshold,
            "Repeated malformed payloads, likely a protocol problem"
        );
    }
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("state", &self.state)
            .field("stream_active", &self.is_stream_active())
            .field("polling_active", &self.is_polling_active())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn recv_or_pending<T>(rx: Option<&mut mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn recv_poll_or_pending(poll: Option<&mut PollTimerHandle>) -> Option<PollEvent> {
    match poll {
        Some(poll) => poll.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
