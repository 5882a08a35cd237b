use crate::domain::{OrderEvent, PositionRecord, PositionSide, TimeMs};
use std::collections::HashMap;

/// Open timestamps of the currently open position on each position-side key.
///
/// A key that is absent is in the "no open position" state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivePositionState {
    open_since: HashMap<PositionSide, TimeMs>,
}

impl ActivePositionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_time(&self, key: PositionSide) -> Option<TimeMs> {
        self.open_since.get(&key).copied()
    }

    pub fn is_open(&self, key: PositionSide) -> bool {
        self.open_since.contains_key(&key)
    }

    /// Keys still open, sorted for stable output.
    pub fn open_keys(&self) -> Vec<PositionSide> {
        let mut keys: Vec<PositionSide> = self.open_since.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.open_since.is_empty()
    }
}

/// Advance the per-key open/close state machine by one event.
///
/// - Non-close on a closed key records `event.time` as the open time.
/// - Non-close on an open key changes nothing (adds keep the original clock).
/// - Close emits a record and clears the key. Without a recorded open the
///   record's open time falls back to the close time.
///
/// Events must be fed in non-decreasing time order.
pub fn apply_event(
    mut state: ActivePositionState,
    event: &OrderEvent,
) -> (ActivePositionState, Option<PositionRecord>) {
    let key = event.position_side;

    if !event.is_close {
        state.open_since.entry(key).or_insert(event.time);
        return (state, None);
    }

    let open_time = state.open_since.remove(&key).unwrap_or(event.time);
    let record = PositionRecord {
        symbol: event.symbol.clone(),
        side: event.side,
        position_side: key,
        net_pnl: event.net_pnl(),
        volume: event.total_qty,
        open_time,
        close_time: event.time,
    };

    (state, Some(record))
}

/// Runs `apply_event` over a chronological stream and collects the records.
#[derive(Debug, Default)]
pub struct PositionMatcher {
    pub state: ActivePositionState,
    records: Vec<PositionRecord>,
}

impl PositionMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one order event. Returns the record emitted by it, if any.
    pub fn process_event(&mut self, event: &OrderEvent) -> Option<&PositionRecord> {
        let state = std::mem::take(&mut self.state);
        let (next, record) = apply_event(state, event);
        self.state = next;

        let record = record?;
        self.records.push(record);
        self.records.last()
    }

    /// Keys left open when input ran out. These produce no record.
    pub fn open_positions(&self) -> Vec<PositionSide> {
        self.state.open_keys()
    }

    pub fn into_records(self) -> Vec<PositionRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, Side, Symbol};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn event(key: PositionSide, time_ms: i64, pnl: &str) -> OrderEvent {
        OrderEvent {
            order_id: time_ms,
            symbol: Symbol::new("ETHUSDT"),
            side: Side::Buy,
            position_side: key,
            total_qty: d("1"),
            avg_price: d("2000"),
            total_pnl: d(pnl),
            total_commission: d("0.2"),
            commission_asset: "USDT".to_string(),
            time: TimeMs::new(time_ms),
            is_close: !d(pnl).is_zero(),
        }
    }

    #[test]
    fn test_open_then_close() {
        let state = ActivePositionState::new();
        let (state, rec) = apply_event(state, &event(PositionSide::Both, 10, "0"));
        assert!(rec.is_none());
        assert_eq!(state.open_time(PositionSide::Both), Some(TimeMs::new(10)));

        let (state, rec) = apply_event(state, &event(PositionSide::Both, 20, "5"));
        let rec = rec.unwrap();
        assert_eq!(rec.open_time, TimeMs::new(10));
        assert_eq!(rec.close_time, TimeMs::new(20));
        assert_eq!(rec.net_pnl, d("4.8"));
        assert_eq!(rec.volume, d("1"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_add_does_not_reset_open_clock() {
        let mut matcher = PositionMatcher::new();
        matcher.process_event(&event(PositionSide::Long, 10, "0"));
        matcher.process_event(&event(PositionSide::Long, 15, "0"));
        assert_eq!(matcher.state.open_time(PositionSide::Long), Some(TimeMs::new(10)));

        let rec = matcher
            .process_event(&event(PositionSide::Long, 30, "1"))
            .cloned()
            .unwrap();
        assert_eq!(rec.open_time, TimeMs::new(10));
    }

    #[test]
    fn test_close_without_open_falls_back_to_close_time() {
        let (state, rec) = apply_event(
            ActivePositionState::new(),
            &event(PositionSide::Short, 42, "-3"),
        );
        let rec = rec.unwrap();
        assert_eq!(rec.open_time, TimeMs::new(42));
        assert_eq!(rec.close_time, TimeMs::new(42));
        assert!(rec.has_incomplete_history());
        assert!(!state.is_open(PositionSide::Short));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut matcher = PositionMatcher::new();
        matcher.process_event(&event(PositionSide::Long, 1, "0"));
        matcher.process_event(&event(PositionSide::Short, 2, "0"));
        matcher.process_event(&event(PositionSide::Short, 3, "7"));
        assert!(matcher.state.is_open(PositionSide::Long));
        assert!(!matcher.state.is_open(PositionSide::Short));
        matcher.process_event(&event(PositionSide::Long, 4, "2"));

        let records = matcher.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].position_side, PositionSide::Short);
        assert_eq!(records[0].open_time, TimeMs::new(2));
        assert_eq!(records[1].position_side, PositionSide::Long);
        assert_eq!(records[1].open_time, TimeMs::new(1));
    }

    #[test]
    fn test_close_clears_state_even_for_partial_reduction() {
        let mut matcher = PositionMatcher::new();
        matcher.process_event(&event(PositionSide::Both, 1, "0"));
        matcher.process_event(&event(PositionSide::Both, 2, "1"));
        // Next add starts a fresh clock.
        matcher.process_event(&event(PositionSide::Both, 3, "0"));
        matcher.process_event(&event(PositionSide::Both, 4, "1"));

        let records = matcher.into_records();
        assert_eq!(records[1].open_time, TimeMs::new(3));
    }

    #[test]
    fn test_unclosed_position_produces_no_record() {
        let mut matcher = PositionMatcher::new();
        matcher.process_event(&event(PositionSide::Long, 1, "0"));
        matcher.process_event(&event(PositionSide::Both, 2, "0"));
        assert_eq!(
            matcher.open_positions(),
            vec![PositionSide::Long, PositionSide::Both]
        );
        assert!(matcher.into_records().is_empty());
    }
}
