//! Closed position lifecycle records and their persistence rendering.

use crate::domain::{Decimal, PositionSide, Side, Symbol, TimeMs};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fractional digits used when rendering net PnL.
pub const PNL_DECIMALS: u32 = 2;
/// Fractional digits used when rendering traded volume.
pub const VOLUME_DECIMALS: u32 = 3;

/// One reconciled position lifecycle, emitted exactly once per close event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub symbol: Symbol,
    /// Side of the closing order.
    pub side: Side,
    pub position_side: PositionSide,
    pub net_pnl: Decimal,
    pub volume: Decimal,
    pub open_time: TimeMs,
    pub close_time: TimeMs,
}

impl PositionRecord {
    /// True when no open was observed for this close inside the look-back
    /// window, in which case `open_time` was set to `close_time`.
    pub fn has_incomplete_history(&self) -> bool {
        self.open_time == self.close_time
    }
}

/// A position record rendered for the Store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPosition {
    pub symbol: String,
    pub side: String,
    pub position_side: String,
    /// Two-decimal fixed precision.
    pub net_pnl: String,
    /// Three-decimal fixed precision.
    pub volume: String,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open_time_ms: i64,
    pub close_time_ms: i64,
}

impl FormattedPosition {
    pub fn from_record(record: &PositionRecord) -> Self {
        Self {
            symbol: record.symbol.to_string(),
            side: record.side.to_string(),
            position_side: record.position_side.to_string(),
            net_pnl: record.net_pnl.to_fixed(PNL_DECIMALS),
            volume: record.volume.to_fixed(VOLUME_DECIMALS),
            open_time: record.open_time.to_datetime(),
            close_time: record.close_time.to_datetime(),
            open_time_ms: record.open_time.as_ms(),
            close_time_ms: record.close_time.as_ms(),
        }
    }
}

impl From<&PositionRecord> for FormattedPosition {
    fn from(record: &PositionRecord) -> Self {
        Self::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pnl: &str, volume: &str, open: i64, close: i64) -> PositionRecord {
        PositionRecord {
            symbol: Symbol::new("ETHUSDT"),
            side: Side::Sell,
            position_side: PositionSide::Both,
            net_pnl: Decimal::from_str_canonical(pnl).unwrap(),
            volume: Decimal::from_str_canonical(volume).unwrap(),
            open_time: TimeMs::new(open),
            close_time: TimeMs::new(close),
        }
    }

    #[test]
    fn test_formatted_position_precision() {
        let formatted = FormattedPosition::from_record(&record("24.8", "1", 1_000, 10_000));
        assert_eq!(formatted.net_pnl, "24.80");
        assert_eq!(formatted.volume, "1.000");
        assert_eq!(formatted.side, "SELL");
        assert_eq!(formatted.position_side, "BOTH");
        assert_eq!(formatted.open_time.timestamp_millis(), 1_000);
        assert_eq!(formatted.close_time.timestamp_millis(), 10_000);
    }

    #[test]
    fn test_formatted_position_negative_pnl() {
        let formatted = FormattedPosition::from_record(&record("-3.14159", "0.0005", 1, 2));
        assert_eq!(formatted.net_pnl, "-3.14");
        assert_eq!(formatted.volume, "0.001");
    }

    #[test]
    fn test_incomplete_history_flag() {
        assert!(record("1", "1", 5, 5).has_incomplete_history());
        assert!(!record("1", "1", 4, 5).has_incomplete_history());
    }
}
