use crate::domain::{parse_decimal_field, Decimal, Fill, OrderEvent};
use std::collections::HashMap;
use tracing::warn;

/// Numeric fields of one fill after parsing.
///
/// Each field that failed to parse holds zero; `malformed` lists which ones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedFill {
    pub qty: Decimal,
    pub price: Decimal,
    pub realized_pnl: Decimal,
    pub commission: Decimal,
    pub malformed: Vec<&'static str>,
}

impl ParsedFill {
    pub fn from_fill(fill: &Fill) -> Self {
        let mut malformed = Vec::new();
        let mut field = |name: &'static str, raw: &str| match parse_decimal_field(raw) {
            Ok(value) => value,
            Err(_) => {
                malformed.push(name);
                Decimal::zero()
            }
        };

        let qty = field("qty", &fill.qty);
        let price = field("price", &fill.price);
        let realized_pnl = field("realizedPnl", &fill.realized_pnl);
        let commission = field("commission", &fill.commission);

        Self {
            qty,
            price,
            realized_pnl,
            commission,
            malformed,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty()
    }
}

/// Folds fills into one `OrderEvent` per order id.
///
/// Output order follows the first observation of each order id, not time.
#[derive(Debug, Default)]
pub struct OrderAggregator {
    index: HashMap<i64, usize>,
    events: Vec<OrderEvent>,
    fills_seen: usize,
    malformed_fills: usize,
}

impl OrderAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a single fill into its order.
    pub fn push(&mut self, fill: &Fill) {
        self.fills_seen += 1;

        let parsed = ParsedFill::from_fill(fill);
        let overflowed = match self.index.get(&fill.order_id) {
            Some(&idx) => Self::accumulate(&mut self.events[idx], fill, &parsed),
            None => {
                self.index.insert(fill.order_id, self.events.len());
                self.events.push(Self::seed(fill, &parsed));
                Vec::new()
            }
        };

        if !parsed.is_clean() || !overflowed.is_empty() {
            self.malformed_fills += 1;
            warn!(
                trade_id = fill.trade_id,
                order_id = fill.order_id,
                unparsed = ?parsed.malformed,
                overflowed = ?overflowed,
                "Unusable numeric fields in fill, treating them as zero"
            );
        }
    }

    fn seed(fill: &Fill, parsed: &ParsedFill) -> OrderEvent {
        OrderEvent {
            order_id: fill.order_id,
            symbol: fill.symbol.clone(),
            side: fill.side,
            position_side: fill.position_side,
            total_qty: parsed.qty,
            avg_price: parsed.price,
            total_pnl: parsed.realized_pnl,
            total_commission: parsed.commission,
            commission_asset: fill.commission_asset.clone(),
            time: fill.time_ms,
            is_close: !parsed.realized_pnl.is_zero(),
        }
    }

    /// Merge a subsequent fill. `is_close` and `commission_asset` stay as the
    /// first fill set them.
    ///
    /// A contribution whose sum overflows is dropped; the names of the
    /// dropped fields are returned.
    fn accumulate(
        event: &mut OrderEvent,
        fill: &Fill,
        parsed: &ParsedFill,
    ) -> Vec<&'static str> {
        let mut overflowed = Vec::new();

        let total_value = event
            .avg_price
            .checked_mul(event.total_qty)
            .zip(parsed.price.checked_mul(parsed.qty))
            .and_then(|(held, added)| held.checked_add(added));
        match (total_value, event.total_qty.checked_add(parsed.qty)) {
            (Some(total_value), Some(total_qty)) => {
                event.total_qty = total_qty;
                if total_qty.is_positive() {
                    if let Some(avg) = total_value.checked_div(total_qty) {
                        event.avg_price = avg;
                    }
                }
            }
            _ => overflowed.push("qty"),
        }

        match event.total_pnl.checked_add(parsed.realized_pnl) {
            Some(total) => event.total_pnl = total,
            None => overflowed.push("realizedPnl"),
        }
        match event.total_commission.checked_add(parsed.commission) {
            Some(total) => event.total_commission = total,
            None => overflowed.push("commission"),
        }

        if fill.time_ms > event.time {
            event.time = fill.time_ms;
        }
        overflowed
    }

    pub fn fills_seen(&self) -> usize {
        self.fills_seen
    }

    /// Number of fills with at least one numeric field that was unparseable
    /// or overflowed when summed.
    pub fn malformed_fills(&self) -> usize {
        self.malformed_fills
    }

    pub fn into_events(self) -> Vec<OrderEvent> {
        self.events
    }
}

/// Aggregate fills into order events in first-seen order.
pub fn aggregate(fills: &[Fill]) -> Vec<OrderEvent> {
    let mut aggregator = OrderAggregator::new();
    for fill in fills {
        aggregator.push(fill);
    }
    aggregator.into_events()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PositionSide, Side, Symbol, TimeMs};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn fill(order_id: i64, qty: &str, price: &str, pnl: &str, time_ms: i64) -> Fill {
        Fill::new(
            time_ms,
            order_id,
            Symbol::new("ETHUSDT"),
            Side::Buy,
            PositionSide::Both,
            qty,
            price,
            pnl,
            "0.10",
            "USDT",
            TimeMs::new(time_ms),
        )
    }

    #[test]
    fn test_single_fill_seeds_event() {
        let events = aggregate(&[fill(7, "0.5", "2000", "0", 100)]);
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.order_id, 7);
        assert_eq!(e.total_qty, d("0.5"));
        assert_eq!(e.avg_price, d("2000"));
        assert_eq!(e.total_commission, d("0.10"));
        assert_eq!(e.time, TimeMs::new(100));
        assert!(!e.is_close);
    }

    #[test]
    fn test_weighted_average_price() {
        let events = aggregate(&[
            fill(1, "1", "100", "0", 1),
            fill(1, "3", "200", "0", 2),
        ]);
        assert_eq!(events[0].total_qty, d("4"));
        assert_eq!(events[0].avg_price, d("175"));
    }

    #[test]
    fn test_time_is_latest_fill_regardless_of_input_order() {
        let events = aggregate(&[
            fill(1, "1", "100", "0", 50),
            fill(1, "1", "100", "0", 20),
            fill(1, "1", "100", "0", 80),
        ]);
        assert_eq!(events[0].time, TimeMs::new(80));
    }

    #[test]
    fn test_output_follows_first_seen_order() {
        let events = aggregate(&[
            fill(30, "1", "1", "0", 300),
            fill(10, "1", "1", "0", 100),
            fill(30, "1", "1", "0", 301),
            fill(20, "1", "1", "0", 200),
        ]);
        let ids: Vec<i64> = events.iter().map(|e| e.order_id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn test_is_close_decided_by_first_fill() {
        let events = aggregate(&[
            fill(1, "1", "100", "5", 1),
            fill(1, "1", "100", "-5", 2),
            fill(2, "1", "100", "0", 3),
            fill(2, "1", "100", "4", 4),
        ]);
        assert!(events[0].is_close);
        assert!(events[0].total_pnl.is_zero());
        assert!(!events[1].is_close);
        assert_eq!(events[1].total_pnl, d("4"));
    }

    #[test]
    fn test_commission_asset_from_first_fill() {
        let mut bnb = fill(1, "1", "100", "0", 2);
        bnb.commission_asset = "BNB".to_string();
        let events = aggregate(&[fill(1, "1", "100", "0", 1), bnb]);
        assert_eq!(events[0].commission_asset, "USDT");
        assert_eq!(events[0].total_commission, d("0.2"));
    }

    #[test]
    fn test_malformed_fields_degrade_to_zero() {
        let mut aggregator = OrderAggregator::new();
        aggregator.push(&fill(1, "1", "100", "0", 1));
        aggregator.push(&fill(1, "oops", "200", "0", 2));
        assert_eq!(aggregator.fills_seen(), 2);
        assert_eq!(aggregator.malformed_fills(), 1);

        let events = aggregator.into_events();
        assert_eq!(events[0].total_qty, d("1"));
        // Zero quantity contributes nothing to the weighted price.
        assert_eq!(events[0].avg_price, d("100"));
    }

    #[test]
    fn test_overflowing_contributions_degrade_to_zero() {
        let max = "79228162514264337593543950335";
        let mut aggregator = OrderAggregator::new();
        aggregator.push(&fill(1, "2", max, "0", 1));
        aggregator.push(&fill(1, "2", "100", "0", 2));
        aggregator.push(&fill(2, "1", "100", max, 3));
        aggregator.push(&fill(2, "1", "100", max, 4));
        assert_eq!(aggregator.fills_seen(), 4);
        assert_eq!(aggregator.malformed_fills(), 2);

        let events = aggregator.into_events();
        assert_eq!(events[0].total_qty, d("2"));
        assert_eq!(events[0].avg_price, d(max));
        assert_eq!(events[0].total_commission, d("0.20"));
        assert_eq!(events[0].time, TimeMs::new(2));

        assert_eq!(events[1].total_pnl, d(max));
        assert_eq!(events[1].total_qty, d("2"));
        assert_eq!(events[1].avg_price, d("100"));
    }

    #[test]
    fn test_zero_total_quantity_keeps_price() {
        let events = aggregate(&[
            fill(1, "bad", "100", "0", 1),
            fill(1, "", "200", "0", 2),
        ]);
        assert!(events[0].total_qty.is_zero());
        assert_eq!(events[0].avg_price, d("100"));
    }

    #[test]
    fn test_parsed_fill_reports_each_bad_field() {
        let mut f = fill(1, "x", "y", "0", 1);
        f.commission = "".to_string();
        let parsed = ParsedFill::from_fill(&f);
        assert_eq!(parsed.malformed, vec!["qty", "price", "commission"]);
        assert!(!parsed.is_clean());
        assert!(ParsedFill::from_fill(&fill(1, "1", "1", "0", 1)).is_clean());
    }
}
