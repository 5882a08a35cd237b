//! Pure computation engine for fill reconciliation.
//!
//! Pipeline: fills are folded into order events, sorted by time, then matched
//! per position side into closed position records. Nothing here performs I/O.

use crate::domain::{Fill, PositionRecord, PositionSide};
use tracing::debug;

pub mod aggregator;
pub mod ordering;
pub mod position_matcher;

pub use aggregator::{aggregate, OrderAggregator, ParsedFill};
pub use ordering::{is_chronological, sort_events_chronologically};
pub use position_matcher::{apply_event, ActivePositionState, PositionMatcher};

/// Output of one reconciliation pass over a batch of fills.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    pub records: Vec<PositionRecord>,
    pub fills: usize,
    pub orders: usize,
    pub malformed_fills: usize,
    /// Position sides still open at the end of input.
    pub open_positions: Vec<PositionSide>,
}

/// Aggregate, sort and match a batch of fills for one symbol.
pub fn reconcile(fills: &[Fill]) -> Reconciliation {
    let mut aggregator = OrderAggregator::new();
    for fill in fills {
        aggregator.push(fill);
    }
    let fills_seen = aggregator.fills_seen();
    let malformed_fills = aggregator.malformed_fills();

    let mut events = aggregator.into_events();
    sort_events_chronologically(&mut events);

    let mut matcher = PositionMatcher::new();
    for event in &events {
        matcher.process_event(event);
    }
    let open_positions = matcher.open_positions();
    let records = matcher.into_records();

    debug!(
        fills = fills_seen,
        orders = events.len(),
        records = records.len(),
        malformed_fills,
        "Reconciled fill batch"
    );

    Reconciliation {
        records,
        fills: fills_seen,
        orders: events.len(),
        malformed_fills,
        open_positions,
    }
}
