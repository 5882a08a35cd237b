//! Binance USD-M futures account trade list client.

use super::signing::{encode_query, sign_query};
use super::{TradeSource, TradeSourceError};
use crate::domain::{Fill, Symbol, TimeMs};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";
const USER_TRADES_PATH: &str = "/fapi/v1/userTrades";
const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Largest window per request; the exchange rejects spans over seven days.
pub const DEFAULT_CHUNK_MS: i64 = 6 * 24 * 60 * 60 * 1000;
/// Maximum page size accepted by the endpoint.
pub const DEFAULT_PAGE_LIMIT: usize = 1000;
const RECV_WINDOW_MS: i64 = 5000;

/// Split `[from_ms, to_ms]` into consecutive inclusive sub-windows of at most
/// `chunk_ms` milliseconds.
pub fn chunk_windows(from_ms: i64, to_ms: i64, chunk_ms: i64) -> Vec<(i64, i64)> {
    let chunk_ms = chunk_ms.max(1);
    let mut windows = Vec::new();
    let mut start = from_ms;
    while start <= to_ms {
        let end = start.saturating_add(chunk_ms).min(to_ms);
        windows.push((start, end));
        if end == i64::MAX {
            break;
        }
        start = end + 1;
    }
    windows
}

/// Decode one page of the trade list.
///
/// An element that does not decode fails the whole page: dropping it would
/// shorten a full page and end pagination early.
pub fn parse_trades_page(body: &serde_json::Value) -> Result<Vec<Fill>, TradeSourceError> {
    let items = body
        .as_array()
        .ok_or_else(|| TradeSourceError::ParseError("Expected array response".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<Fill>(item.clone()).map_err(|e| {
                warn!(index = i, error = %e, "Failed to parse trade");
                TradeSourceError::ParseError(format!("trade at index {}: {}", i, e))
            })
        })
        .collect()
}

/// Trade source backed by the signed `userTrades` endpoint.
#[derive(Debug, Clone)]
pub struct BinanceTradeSource {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    chunk_ms: i64,
    page_limit: usize,
    chunk_pause: Duration,
    max_retry_elapsed: Duration,
}

impl BinanceTradeSource {
    pub fn new(base_url: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_secret,
            chunk_ms: DEFAULT_CHUNK_MS,
            page_limit: DEFAULT_PAGE_LIMIT,
            chunk_pause: Duration::from_millis(100),
            max_retry_elapsed: Duration::from_secs(30),
        }
    }

    pub fn with_chunk_ms(mut self, chunk_ms: i64) -> Self {
        self.chunk_ms = chunk_ms;
        self
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.clamp(1, DEFAULT_PAGE_LIMIT);
        self
    }

    pub fn with_chunk_pause(mut self, pause: Duration) -> Self {
        self.chunk_pause = pause;
        self
    }

    pub fn with_max_retry_elapsed(mut self, elapsed: Duration) -> Self {
        self.max_retry_elapsed = elapsed;
        self
    }

    /// One signed page request, retried on transient failures.
    async fn fetch_page(
        &self,
        symbol: &Symbol,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Fill>, TradeSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry_elapsed),
            ..Default::default()
        };

        let body = retry(backoff, || async {
            // Re-signed per attempt so the timestamp stays inside recvWindow.
            let query = encode_query(&[
                ("symbol", symbol.to_string()),
                ("limit", self.page_limit.to_string()),
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("recvWindow", RECV_WINDOW_MS.to_string()),
                ("timestamp", TimeMs::now().as_ms().to_string()),
            ]);
            let signature =
                sign_query(&self.api_secret, &query).map_err(backoff::Error::permanent)?;
            let url = format!(
                "{}{}?{}&signature={}",
                self.base_url, USER_TRADES_PATH, query, signature
            );

            let response = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(TradeSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status.as_u16() == 429 || status.as_u16() == 418 {
                return Err(backoff::Error::transient(TradeSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(TradeSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(TradeSourceError::HttpError {
                    status: status.as_u16(),
                    message,
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(TradeSourceError::ParseError(e.to_string())))
        })
        .await?;

        parse_trades_page(&body)
    }

    /// All fills inside one chunk, following full pages forward in time.
    async fn fetch_chunk(
        &self,
        symbol: &Symbol,
        start_ms: i64,
        end_ms: i64,
        seen: &mut HashSet<i64>,
        out: &mut Vec<Fill>,
    ) -> Result<(), TradeSourceError> {
        let mut cursor = start_ms;
        loop {
            let page = self.fetch_page(symbol, cursor, end_ms).await?;
            let page_full = page.len() >= self.page_limit;
            let latest = page.iter().map(|f| f.time_ms.as_ms()).max();

            for fill in page {
                if seen.insert(fill.trade_id) {
                    out.push(fill);
                }
            }

            if !page_full {
                return Ok(());
            }
            match latest {
                Some(t) if t > cursor => {
                    debug!(symbol = %symbol, cursor = t, "Page full, continuing within chunk");
                    cursor = t;
                }
                _ => {
                    return Err(TradeSourceError::Other(format!(
                        "more than {} trades at {}ms, window cannot be completed",
                        self.page_limit, cursor
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl TradeSource for BinanceTradeSource {
    async fn fetch_fills(
        &self,
        symbol: &Symbol,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<Fill>, TradeSourceError> {
        let windows = chunk_windows(from_ms, to_ms, self.chunk_ms);
        let mut seen = HashSet::new();
        let mut fills = Vec::new();

        for (i, (start, end)) in windows.iter().copied().enumerate() {
            info!(
                symbol = %symbol,
                from = %TimeMs::new(start).to_datetime().format("%Y-%m-%d %H:%M"),
                to = %TimeMs::new(end).to_datetime().format("%Y-%m-%d %H:%M"),
                "Fetching trade chunk"
            );
            self.fetch_chunk(symbol, start, end, &mut seen, &mut fills)
                .await?;

            if i + 1 < windows.len() && !self.chunk_pause.is_zero() {
                tokio::time::sleep(self.chunk_pause).await;
            }
        }

        debug!(symbol = %symbol, fills = fills.len(), "Fetched trade window");
        Ok(fills)
    }
}
