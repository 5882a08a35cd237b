//! Fill type representing a single exchange execution.

use crate::domain::{PositionSide, Side, Symbol, TimeMs};
use serde::{Deserialize, Serialize};

/// A single trade fill/execution as reported by the exchange.
///
/// Numeric fields are kept as the exchange-reported decimal strings; they are
/// parsed during aggregation so malformed values can be counted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    /// Exchange trade ID.
    #[serde(rename = "id")]
    pub trade_id: i64,
    /// Order this fill belongs to. Several fills may share one order.
    pub order_id: i64,
    pub symbol: Symbol,
    pub side: Side,
    pub position_side: PositionSide,
    pub qty: String,
    pub price: String,
    pub realized_pnl: String,
    /// Fee amount, denominated in `commission_asset`.
    pub commission: String,
    /// Fee currency (e.g., "USDT" or "BNB").
    pub commission_asset: String,
    /// Execution time in milliseconds since Unix epoch.
    #[serde(rename = "time")]
    pub time_ms: TimeMs,
}

impl Fill {
    /// Create a new Fill.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: i64,
        order_id: i64,
        symbol: Symbol,
        side: Side,
        position_side: PositionSide,
        qty: impl Into<String>,
        price: impl Into<String>,
        realized_pnl: impl Into<String>,
        commission: impl Into<String>,
        commission_asset: impl Into<String>,
        time_ms: TimeMs,
    ) -> Self {
        Fill {
            trade_id,
            order_id,
            symbol,
            side,
            position_side,
            qty: qty.into(),
            price: price.into(),
            realized_pnl: realized_pnl.into(),
            commission: commission.into(),
            commission_asset: commission_asset.into(),
            time_ms,
        }
    }
}
