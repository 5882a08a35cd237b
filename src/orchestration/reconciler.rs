use crate::datasource::{TradeSource, TradeSourceError};
use crate::db::Repository;
use crate::domain::{FormattedPosition, Symbol, TimeMs};
use crate::engine;
use crate::report;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Diagnostics for one reconciliation run, persisted in `reconcile_runs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub symbol: Symbol,
    pub window_from: TimeMs,
    pub window_to: TimeMs,
    pub started_at: TimeMs,
    pub finished_at: TimeMs,
    pub fills: usize,
    pub orders: usize,
    pub malformed_fills: usize,
    pub records: usize,
    /// Records that were not already stored.
    pub records_inserted: usize,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("trade source: {0}")]
    Source(#[from] TradeSourceError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("invalid window: from {from} is after to {to}")]
    InvalidWindow { from: TimeMs, to: TimeMs },
}

#[derive(Clone)]
pub struct Reconciler {
    source: Arc<dyn TradeSource>,
    repo: Arc<Repository>,
    symbol: Symbol,
    lookback_ms: i64,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn TradeSource>,
        repo: Arc<Repository>,
        symbol: Symbol,
        lookback_ms: i64,
    ) -> Self {
        Self {
            source,
            repo,
            symbol,
            lookback_ms,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Reconcile the configured symbol over `[now - lookback, now]`.
    pub async fn run_lookback(&self, now: TimeMs) -> Result<RunSummary, ReconcileError> {
        let from = now.saturating_sub_ms(self.lookback_ms);
        self.run_window(&self.symbol, from, now).await
    }

    /// Fetch, reconcile and persist one window.
    ///
    /// The fetch happens before any write, so a source failure leaves the
    /// store untouched.
    pub async fn run_window(
        &self,
        symbol: &Symbol,
        from: TimeMs,
        to: TimeMs,
    ) -> Result<RunSummary, ReconcileError> {
        if from > to {
            return Err(ReconcileError::InvalidWindow { from, to });
        }

        let run_id = Uuid::new_v4();
        let started_at = TimeMs::now();
        info!(
            run_id = %run_id,
            symbol = %symbol,
            from = %from.to_datetime(),
            to = %to.to_datetime(),
            "Starting reconciliation run"
        );

        let fills = self
            .source
            .fetch_fills(symbol, from.as_ms(), to.as_ms())
            .await
            .map_err(|e| {
                warn!(run_id = %run_id, symbol = %symbol, error = %e, "Trade fetch failed");
                e
            })?;

        let outcome = engine::reconcile(&fills);
        if !outcome.open_positions.is_empty() {
            debug!(
                run_id = %run_id,
                open = ?outcome.open_positions,
                "Positions still open at end of window"
            );
        }

        let positions: Vec<FormattedPosition> = outcome
            .records
            .iter()
            .map(FormattedPosition::from_record)
            .collect();
        let records_inserted = self.repo.upsert_positions_batch(&positions).await?;

        if !positions.is_empty() {
            debug!("\n{}", report::render_table(&positions));
        }

        let summary = RunSummary {
            run_id,
            symbol: symbol.clone(),
            window_from: from,
            window_to: to,
            started_at,
            finished_at: TimeMs::now(),
            fills: outcome.fills,
            orders: outcome.orders,
            malformed_fills: outcome.malformed_fills,
            records: positions.len(),
            records_inserted,
        };
        self.repo.insert_run(&summary).await?;

        info!(
            run_id = %run_id,
            symbol = %symbol,
            fills = summary.fills,
            orders = summary.orders,
            records = summary.records,
            records_inserted,
            malformed_fills = summary.malformed_fills,
            "Reconciliation run finished"
        );

        Ok(summary)
    }
}
