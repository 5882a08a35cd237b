//! Aggregate of all fills sharing one order identifier.

use crate::domain::{Decimal, PositionSide, Side, Symbol, TimeMs};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Commission currency whose fees are deducted from realized PnL.
pub const FEE_DEDUCTIBLE_ASSET: &str = "USDT";

/// One logical order: the fold of every fill carrying the same `order_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub order_id: i64,
    pub symbol: Symbol,
    pub side: Side,
    pub position_side: PositionSide,
    pub total_qty: Decimal,
    /// Fill-quantity-weighted mean of constituent fill prices.
    pub avg_price: Decimal,
    pub total_pnl: Decimal,
    pub total_commission: Decimal,
    /// Taken from the first fill of the order.
    pub commission_asset: String,
    /// Latest fill timestamp contributing to the order.
    pub time: TimeMs,
    /// Decided by the first fill: non-zero realized PnL means a close.
    pub is_close: bool,
}

impl OrderEvent {
    /// Realized PnL after the fee rule: commission is subtracted only when it
    /// is denominated in USDT; other assets are left unconverted.
    ///
    /// A commission whose subtraction overflows contributes zero.
    pub fn net_pnl(&self) -> Decimal {
        if self.commission_asset != FEE_DEDUCTIBLE_ASSET {
            return self.total_pnl;
        }
        self.total_pnl
            .checked_sub(self.total_commission)
            .unwrap_or_else(|| {
                warn!(
                    order_id = self.order_id,
                    pnl = %self.total_pnl,
                    commission = %self.total_commission,
                    "Commission deduction overflowed, using gross PnL"
                );
                self.total_pnl
            })
    }
}
