//! Domain types for fill reconciliation.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper and the exchange field parser
//! - Domain primitives: TimeMs, Symbol, Side, PositionSide
//! - Fill, OrderEvent and PositionRecord types

pub mod decimal;
pub mod fill;
pub mod order_event;
pub mod position;
pub mod primitives;

pub use decimal::{parse_decimal_field, Decimal, FieldParseError};
pub use fill::Fill;
pub use order_event::{OrderEvent, FEE_DEDUCTIBLE_ASSET};
pub use position::{FormattedPosition, PositionRecord, PNL_DECIMALS, VOLUME_DECIMALS};
pub use primitives::{PositionSide, Side, Symbol, TimeMs};
