//! Trade stream adapter tests against a local WebSocket server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use price_fallback::infrastructure::binance::{BinanceTradeStream, TradeStreamConfig};
use price_fallback::{StreamEvent, StreamSource, Symbol, TickSource};
use rust_decimal::Decimal;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Accept one WebSocket connection and hand it to `handler`.
async fn serve_once<F, Fut>(handler: F) -> (String, JoinHandle<Fut::Output>)
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(socket).await.unwrap();
        handler(ws).await
    });

    (format!("ws://{addr}/ws"), task)
}

fn stream_for(endpoint: &str) -> Arc<BinanceTradeStream> {
    Arc::new(BinanceTradeStream::new(TradeStreamConfig::new(
        endpoint,
        Symbol::new("BTCUSDT"),
    )))
}

/// Run the source and collect events until `Closed`.
async fn collect_until_closed(
    source: Arc<BinanceTradeStream>,
    close: CancellationToken,
) -> Vec<StreamEvent> {
    let (tx, mut rx) = mpsc::channel(64);
    let run = tokio::spawn(async move { source.run(tx, close).await });

    let mut events = Vec::new();
    tokio::time::timeout(TIMEOUT, async {
        while let Some(event) = rx.recv().await {
            let closed = event == StreamEvent::Closed;
            events.push(event);
            if closed {
                break;
            }
        }
    })
    .await
    .expect("stream did not close in time");

    tokio::time::timeout(TIMEOUT, run).await.unwrap().unwrap();
    assert!(rx.recv().await.is_none(), "event emitted after Closed");
    events
}

#[tokio::test]
async fn reports_open_ticks_malformed_and_close() {
    let (endpoint, server) = serve_once(|mut ws| async move {
        ws.send(Message::Text(
            r#"{"e":"trade","s":"BTCUSDT","p":"65000.50","q":"0.01","T":1700000000000}"#.into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(r#"{"e":"trade","q":"0.01","T":1700000000000}"#.into()))
            .await
            .unwrap();
        ws.send(Message::Text(
            r#"{"e":"trade","s":"BTCUSDT","p":"abc","q":"0.01","T":1700000000000}"#.into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"e":"trade","s":"BTCUSDT","p":"65001.00","q":"0.02","T":1700000000500}"#.into(),
        ))
        .await
        .unwrap();
        ws.close(None).await.unwrap();
        while ws.next().await.is_some() {}
    })
    .await;

    let events = collect_until_closed(stream_for(&endpoint), CancellationToken::new()).await;
    server.await.unwrap();

    assert_eq!(events.len(), 6, "events: {events:?}");
    assert_eq!(events[0], StreamEvent::Opened);
    match &events[1] {
        StreamEvent::Tick(tick) => {
            assert_eq!(tick.source, TickSource::Stream);
            assert_eq!(tick.price, Decimal::from_str("65000.50").unwrap());
            assert_eq!(tick.timestamp_millis, 1_700_000_000_000);
        }
        other => panic!("expected tick, got {other:?}"),
    }
    assert!(matches!(events[2], StreamEvent::Malformed(_)));
    assert!(matches!(events[3], StreamEvent::Malformed(_)));
    assert!(matches!(&events[4], StreamEvent::Tick(t) if t.price == Decimal::from_str("65001.00").unwrap()));
    assert_eq!(events[5], StreamEvent::Closed);
}

#[tokio::test]
async fn connect_failure_reports_error_then_closed() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let events = collect_until_closed(
        stream_for(&format!("ws://{addr}/ws")),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(events.len(), 2, "events: {events:?}");
    assert!(matches!(events[0], StreamEvent::Error(_)));
    assert_eq!(events[1], StreamEvent::Closed);
}

#[tokio::test]
async fn close_token_sends_close_frame() {
    let (endpoint, server) = serve_once(|mut ws| async move {
        while let Some(msg) = ws.next().await {
            if matches!(msg, Ok(Message::Close(_))) {
                return true;
            }
        }
        false
    })
    .await;

    let source = stream_for(&endpoint);
    let close = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(16);
    let run = {
        let close = close.clone();
        tokio::spawn(async move { source.run(tx, close).await })
    };

    let first = tokio::time::timeout(TIMEOUT, rx.recv()).await.unwrap();
    assert_eq!(first, Some(StreamEvent::Opened));

    close.cancel();

    let next = tokio::time::timeout(TIMEOUT, rx.recv()).await.unwrap();
    assert_eq!(next, Some(StreamEvent::Closed));
    tokio::time::timeout(TIMEOUT, run).await.unwrap().unwrap();

    assert!(tokio::time::timeout(TIMEOUT, server).await.unwrap().unwrap());
}

#[tokio::test]
async fn answers_ping_with_pong() {
    let (endpoint, server) = serve_once(|mut ws| async move {
        ws.send(Message::Ping(vec![7, 7, 7].into())).await.unwrap();
        let reply = loop {
            match ws.next().await {
                Some(Ok(Message::Pong(data))) => break Some(data.to_vec()),
                Some(Ok(_)) => {}
                _ => break None,
            }
        };
        ws.close(None).await.unwrap();
        while ws.next().await.is_some() {}
        reply
    })
    .await;

    let events = collect_until_closed(stream_for(&endpoint), CancellationToken::new()).await;

    assert_eq!(events.first(), Some(&StreamEvent::Opened));
    assert_eq!(events.last(), Some(&StreamEvent::Closed));
    assert_eq!(server.await.unwrap(), Some(vec![7, 7, 7]));
}
