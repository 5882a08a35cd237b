//! Mock trade source for testing without network calls.

use super::{TradeSource, TradeSourceError};
use crate::domain::{Fill, Symbol, TimeMs};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock trade source that returns predefined fills.
#[derive(Debug, Clone, Default)]
pub struct MockTradeSource {
    fills: Vec<Fill>,
    failure: Option<TradeSourceError>,
    calls: Arc<AtomicUsize>,
}

impl MockTradeSource {
    /// Create a new mock trade source with no fills.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fill to the mock trade source.
    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fills.push(fill);
        self
    }

    /// Add multiple fills to the mock trade source.
    pub fn with_fills(mut self, fills: Vec<Fill>) -> Self {
        self.fills.extend(fills);
        self
    }

    /// Make every fetch fail with `error`.
    pub fn failing_with(mut self, error: TradeSourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of fetches served so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradeSource for MockTradeSource {
    async fn fetch_fills(
        &self,
        symbol: &Symbol,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<Fill>, TradeSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let from_time = TimeMs::new(from_ms);
        let to_time = TimeMs::new(to_ms);

        Ok(self
            .fills
            .iter()
            .filter(|f| &f.symbol == symbol && f.time_ms >= from_time && f.time_ms <= to_time)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PositionSide, Side};

    fn make_test_fill(symbol: &str, time_ms: i64) -> Fill {
        Fill::new(
            time_ms,
            1,
            Symbol::new(symbol),
            Side::Buy,
            PositionSide::Both,
            "1",
            "2000",
            "0",
            "0.1",
            "USDT",
            TimeMs::new(time_ms),
        )
    }

    #[tokio::test]
    async fn test_mock_fetch_filters_symbol_and_window() {
        let mock = MockTradeSource::new()
            .with_fill(make_test_fill("ETHUSDT", 1000))
            .with_fill(make_test_fill("ETHUSDT", 5000))
            .with_fill(make_test_fill("BTCUSDT", 1000));

        let fills = mock
            .fetch_fills(&Symbol::new("ETHUSDT"), 0, 2000)
            .await
            .unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].time_ms, TimeMs::new(1000));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockTradeSource::new()
            .with_fill(make_test_fill("ETHUSDT", 1000))
            .failing_with(TradeSourceError::RateLimited);

        let err = mock
            .fetch_fills(&Symbol::new("ETHUSDT"), 0, 2000)
            .await
            .unwrap_err();
        assert_eq!(err, TradeSourceError::RateLimited);
        assert_eq!(mock.calls(), 1);
    }
}
