//! Reconciliation run log.

use crate::domain::{Symbol, TimeMs};
use crate::orchestration::RunSummary;
use sqlx::Row;
use tracing::warn;
use uuid::Uuid;

use super::Repository;

impl Repository {
    /// Record the outcome of a reconciliation run.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_run(&self, run: &RunSummary) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO reconcile_runs (
                run_id, symbol, window_from_ms, window_to_ms, started_at_ms, finished_at_ms,
                fills, orders, malformed_fills, records, records_inserted
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.run_id.to_string())
        .bind(run.symbol.as_str())
        .bind(run.window_from.as_ms())
        .bind(run.window_to.as_ms())
        .bind(run.started_at.as_ms())
        .bind(run.finished_at.as_ms())
        .bind(run.fills as i64)
        .bind(run.orders as i64)
        .bind(run.malformed_fills as i64)
        .bind(run.records as i64)
        .bind(run.records_inserted as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent runs first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_runs(&self, limit: u32) -> Result<Vec<RunSummary>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT run_id, symbol, window_from_ms, window_to_ms, started_at_ms, finished_at_ms,
                   fills, orders, malformed_fills, records, records_inserted
            FROM reconcile_runs
            ORDER BY started_at_ms DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let runs = rows
            .iter()
            .map(|row| {
                let run_id_str: String = row.get("run_id");
                let run_id = Uuid::parse_str(&run_id_str).unwrap_or_else(|e| {
                    warn!(
                        run_id = %run_id_str,
                        error = %e,
                        "Failed to parse stored run id, using nil"
                    );
                    Uuid::nil()
                });
                let count = |col: &str| row.get::<i64, _>(col).max(0) as usize;

                RunSummary {
                    run_id,
                    symbol: Symbol::new(row.get::<String, _>("symbol")),
                    window_from: TimeMs::new(row.get("window_from_ms")),
                    window_to: TimeMs::new(row.get("window_to_ms")),
                    started_at: TimeMs::new(row.get("started_at_ms")),
                    finished_at: TimeMs::new(row.get("finished_at_ms")),
                    fills: count("fills"),
                    orders: count("orders"),
                    malformed_fills: count("malformed_fills"),
                    records: count("records"),
                    records_inserted: count("records_inserted"),
                }
            })
            .collect();

        Ok(runs)
    }
}
