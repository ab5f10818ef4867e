//! Binance Trade Stream Client
//!
//! Connects to the Binance `<symbol>@trade` WebSocket stream and reports
//! connection lifecycle and decoded trades as [`StreamEvent`]s.
//!
//! # Stream URL
//!
//! - Production: `wss://stream.binance.com:9443/ws/btcusdt@trade`
//!
//! # Protocol
//!
//! Each text frame is one JSON trade object. The server pings periodically
//! and expects a pong carrying the same payload.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::TradeCodec;
use crate::application::ports::{StreamEvent, StreamSource};
use crate::domain::Symbol;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that end a trade stream connection.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    Connect(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the trade stream client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeStreamConfig {
    /// WebSocket base URL, without the stream name.
    pub endpoint: String,
    /// Tracked symbol.
    pub symbol: Symbol,
}

impl TradeStreamConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, symbol: Symbol) -> Self {
        Self {
            endpoint: endpoint.into(),
            symbol,
        }
    }

    /// Full stream URL for the configured symbol.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/{}@trade",
            self.endpoint.trim_end_matches('/'),
            self.symbol.stream_name()
        )
    }
}

// =============================================================================
// Trade Stream Client
// =============================================================================

/// WebSocket client for one symbol's trade stream.
#[derive(Debug, Clone)]
pub struct BinanceTradeStream {
    config: TradeStreamConfig,
    codec: TradeCodec,
}

impl BinanceTradeStream {
    /// Create a new trade stream client.
    #[must_use]
    pub fn new(config: TradeStreamConfig) -> Self {
        let codec = TradeCodec::new(config.symbol.clone());
        Self { config, codec }
    }

    /// Connect and forward events until the connection ends or `close` fires.
    ///
    /// Returns `Ok` for a close requested by either side and for a stopped
    /// receiver; transport failures are returned as errors.
    async fn connect_and_run(
        &self,
        events: &mpsc::Sender<StreamEvent>,
        close: &CancellationToken,
    ) -> Result<(), StreamError> {
        let url = self.config.url();
        tracing::info!(url = %url, "Connecting to trade stream");

        let (ws_stream, _response) = tokio::select! {
            () = close.cancelled() => {
                tracing::debug!("Close requested before connect completed");
                return Ok(());
            }
            result = tokio_tungstenite::connect_async(url.as_str()) => {
                result.map_err(|e| StreamError::Connect(e.to_string()))?
            }
        };

        let (mut write, mut read) = ws_stream.split();

        if events.send(StreamEvent::Opened).await.is_err() {
            return Ok(());
        }

        loop {
            tokio::select! {
                () = close.cancelled() => {
                    tracing::debug!("Close requested, sending close frame");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        tracing::debug!(error = %e, "Failed to send close frame");
                    }
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let event = match self.codec.decode(&text) {
                                Ok(tick) => StreamEvent::Tick(tick),
                                Err(e) => StreamEvent::Malformed(e.to_string()),
                            };
                            if events.send(event).await.is_err() {
                                tracing::debug!("Stream event channel closed");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(frame = ?frame, "Server sent close frame");
                            return Ok(());
                        }
                        Some(Ok(_)) => {
                            // Ignore other message types
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            tracing::info!("WebSocket stream ended");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl StreamSource for BinanceTradeStream {
    async fn run(&self, events: mpsc::Sender<StreamEvent>, close: CancellationToken) {
        if let Err(e) = self.connect_and_run(&events, &close).await {
            tracing::warn!(error = %e, "Trade stream connection error");
            let _ = events.send(StreamEvent::Error(e.to_string())).await;
        }
        let _ = events.send(StreamEvent::Closed).await;
    }
}
