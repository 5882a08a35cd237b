//! Trade source abstraction for fetching raw exchange fills.

use crate::domain::{Fill, Symbol};
use async_trait::async_trait;
use std::fmt;

pub mod binance;
pub mod mock;
pub mod signing;

pub use binance::BinanceTradeSource;
pub use mock::MockTradeSource;

/// Source of raw fills for one symbol over a bounded window.
///
/// Implementations own pagination, signing, retry/backoff and rate limiting.
/// A window is either returned complete or not at all.
#[async_trait]
pub trait TradeSource: Send + Sync + fmt::Debug {
    /// Fetch fills for `symbol` with `from_ms <= time <= to_ms`.
    ///
    /// Order of the returned fills is unspecified.
    async fn fetch_fills(
        &self,
        symbol: &Symbol,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<Fill>, TradeSourceError>;
}

/// Error type for trade source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 4xx rejection, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded after retries
    RateLimited,
    /// Request could not be signed
    Signing(String),
    /// Other error
    Other(String),
}

impl fmt::Display for TradeSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            TradeSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            TradeSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            TradeSourceError::RateLimited => write!(f, "Rate limited"),
            TradeSourceError::Signing(msg) => write!(f, "Signing error: {}", msg),
            TradeSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for TradeSourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_source_error_display() {
        let err = TradeSourceError::NetworkError("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = TradeSourceError::HttpError {
            status: 401,
            message: "Invalid API-key".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 401: Invalid API-key");

        let err = TradeSourceError::ParseError("invalid JSON".to_string());
        assert_eq!(err.to_string(), "Parse error: invalid JSON");

        assert_eq!(TradeSourceError::RateLimited.to_string(), "Rate limited");
    }
}
