//! Poll Source
//!
//! Periodic request/response price lookup used as the fallback source.
//! Fetches once immediately on start, then once per interval, reporting
//! each outcome as a [`PollEvent`]. Failures never stop the schedule.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FetchError, PriceFetcher};
use crate::domain::{PriceTick, Symbol};

/// Buffered poll outcomes between the timer task and the supervisor.
const POLL_EVENT_CAPACITY: usize = 16;

/// Outcome of one scheduled fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// Fetch succeeded.
    Tick(PriceTick),
    /// Fetch failed; the next attempt follows on schedule.
    Failed(FetchError),
}

/// Schedules price fetches for one symbol.
#[derive(Clone)]
pub struct PollSource {
    fetcher: Arc<dyn PriceFetcher>,
    symbol: Symbol,
    interval: Duration,
}

impl PollSource {
    /// Create a poll source. `interval` must be non-zero.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PriceFetcher>, symbol: Symbol, interval: Duration) -> Self {
        Self {
            fetcher,
            symbol,
            interval,
        }
    }

    /// Polling period.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the timer task and return its handle.
    ///
    /// The first fetch is issued immediately rather than after one period.
    #[must_use]
    pub fn start(&self) -> PollTimerHandle {
        self.spawn(Duration::ZERO)
    }

    /// Spawn the timer task with the first fetch one period from now.
    ///
    /// Used when replacing a timer that ended, so a failing fetch is not
    /// retried ahead of schedule.
    #[must_use]
    pub fn start_delayed(&self) -> PollTimerHandle {
        self.spawn(self.interval)
    }

    fn spawn(&self, first_fetch_in: Duration) -> PollTimerHandle {
        let (event_tx, events) = mpsc::channel(POLL_EVENT_CAPACITY);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.fetcher),
            self.symbol.clone(),
            first_fetch_in,
            self.interval,
            event_tx,
            cancel.clone(),
        ));

        tracing::info!(
            symbol = %self.symbol,
            interval_ms = self.interval.as_millis(),
            first_fetch_in_ms = first_fetch_in.as_millis(),
            "Polling started"
        );

        PollTimerHandle {
            cancel,
            task,
            events,
        }
    }
}

impl std::fmt::Debug for PollSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollSource")
            .field("symbol", &self.symbol)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

async fn poll_loop(
    fetcher: Arc<dyn PriceFetcher>,
    symbol: Symbol,
    first_fetch_in: Duration,
    period: Duration,
    event_tx: mpsc::Sender<PollEvent>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + first_fetch_in, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("Poll timer cancelled");
                break;
            }
            _ = interval.tick() => {
                let event = tokio::select! {
                    () = cancel.cancelled() => break,
                    result = fetcher.fetch_price(&symbol) => match result {
                        Ok(price) => PollEvent::Tick(PriceTick::from_poll(symbol.clone(), price, Utc::now())),
                        Err(e) => PollEvent::Failed(e),
                    },
                };

                if event_tx.send(event).await.is_err() {
                    tracing::debug!("Poll event channel closed, stopping timer");
                    break;
                }
            }
        }
    }
}

// =============================================================================
// Poll Timer Handle
// =============================================================================

/// Ownership of a running poll timer.
///
/// Held exclusively by the supervisor. Dropping or stopping the handle
/// cancels the timer and discards any outcome not yet received.
#[derive(Debug)]
pub struct PollTimerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    events: mpsc::Receiver<PollEvent>,
}

impl PollTimerHandle {
    /// Wait for the next poll outcome. `None` means the timer task has ended.
    pub async fn recv(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    /// Whether the timer task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the timer. No outcome is delivered after this returns.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PollTimerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
        self.events.close();
    }
}
