//! Binance Adapters
//!
//! Implements the stream and poll ports against Binance spot market data:
//!
//! - **Trade stream**: `<symbol>@trade` over WebSocket (JSON codec)
//! - **Price ticker**: `GET /api/v3/ticker/price` over HTTPS

pub mod codec;
pub mod messages;
pub mod rest;
pub mod stream;

pub use codec::{CodecError, TradeCodec};
pub use messages::{TickerPriceResponse, TradeMessage};
pub use rest::BinanceTickerClient;
pub use stream::{BinanceTradeStream, StreamError, TradeStreamConfig};
