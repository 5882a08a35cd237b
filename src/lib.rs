pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod report;

pub use config::Config;
pub use datasource::{BinanceTradeSource, MockTradeSource, TradeSource, TradeSourceError};
pub use db::{init_db, Repository};
pub use domain::{
    Decimal, Fill, FormattedPosition, OrderEvent, PositionRecord, PositionSide, Side, Symbol,
    TimeMs,
};
pub use engine::{reconcile, Reconciliation};
pub use error::AppError;
pub use orchestration::{spawn_schedule, ReconcileError, Reconciler, RunSummary};
