//! Binance REST price ticker adapter.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::messages::TickerPriceResponse;
use crate::application::ports::{FetchError, PriceFetcher};
use crate::domain::Symbol;

/// Binance price ticker client.
///
/// Implements `PriceFetcher` using `GET /api/v3/ticker/price`.
#[derive(Debug, Clone)]
pub struct BinanceTickerClient {
    client: reqwest::Client,
    endpoint: String,
}

impl BinanceTickerClient {
    /// Create a new ticker client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Network` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn url(&self, symbol: &Symbol) -> String {
        format!("{}?symbol={}", self.endpoint, symbol.as_str())
    }
}

#[async_trait]
impl PriceFetcher for BinanceTickerClient {
    async fn fetch_price(&self, symbol: &Symbol) -> Result<Decimal, FetchError> {
        let response = self
            .client
            .get(self.url(symbol))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let ticker: TickerPriceResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        if !ticker.symbol.is_empty() && !ticker.symbol.eq_ignore_ascii_case(symbol.as_str()) {
            return Err(FetchError::Malformed(format!(
                "response for {} while polling {symbol}",
                ticker.symbol
            )));
        }

        if ticker.price.is_sign_negative() || ticker.price.is_zero() {
            return Err(FetchError::Malformed(format!(
                "non-positive price {}",
                ticker.price
            )));
        }

        Ok(ticker.price)
    }
}
