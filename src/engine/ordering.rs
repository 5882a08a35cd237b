//! Chronological ordering of order events before matching.

use crate::domain::OrderEvent;

/// Sort events by `time` ascending.
///
/// The sort is stable: events with equal timestamps keep the order in which
/// their order ids were first observed.
pub fn sort_events_chronologically(events: &mut [OrderEvent]) {
    events.sort_by_key(|event| event.time);
}

/// Returns true if events are in non-decreasing time order.
pub fn is_chronological(events: &[OrderEvent]) -> bool {
    events.windows(2).all(|pair| pair[0].time <= pair[1].time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, PositionSide, Side, Symbol, TimeMs};

    fn event(order_id: i64, time_ms: i64) -> OrderEvent {
        OrderEvent {
            order_id,
            symbol: Symbol::new("ETHUSDT"),
            side: Side::Buy,
            position_side: PositionSide::Both,
            total_qty: Decimal::zero(),
            avg_price: Decimal::zero(),
            total_pnl: Decimal::zero(),
            total_commission: Decimal::zero(),
            commission_asset: "USDT".to_string(),
            time: TimeMs::new(time_ms),
            is_close: false,
        }
    }

    #[test]
    fn test_sort_by_time() {
        let mut events = vec![event(1, 300), event(2, 100), event(3, 200)];
        assert!(!is_chronological(&events));

        sort_events_chronologically(&mut events);

        let ids: Vec<i64> = events.iter().map(|e| e.order_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(is_chronological(&events));
    }

    #[test]
    fn test_equal_times_keep_first_seen_order() {
        let mut events = vec![event(9, 100), event(4, 50), event(7, 100), event(1, 100)];
        sort_events_chronologically(&mut events);

        let ids: Vec<i64> = events.iter().map(|e| e.order_id).collect();
        assert_eq!(ids, vec![4, 9, 7, 1]);
    }

    #[test]
    fn test_empty_and_single_are_chronological() {
        assert!(is_chronological(&[]));
        assert!(is_chronological(&[event(1, 5)]));
    }
}
