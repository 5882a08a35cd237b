//! Position history operations for the repository.

use crate::domain::{FormattedPosition, Symbol, TimeMs};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::Repository;

const INSERT_POSITION_SQL: &str = r#"
    INSERT INTO position_history (
        recorded_at_ms, symbol, side, position_side, net_pnl, volume,
        open_time_ms, close_time_ms
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(symbol, open_time_ms) DO NOTHING
"#;

fn row_to_position(row: &SqliteRow) -> FormattedPosition {
    let open_time_ms: i64 = row.get("open_time_ms");
    let close_time_ms: i64 = row.get("close_time_ms");
    FormattedPosition {
        symbol: row.get("symbol"),
        side: row.get("side"),
        position_side: row.get("position_side"),
        net_pnl: row.get("net_pnl"),
        volume: row.get("volume"),
        open_time: TimeMs::new(open_time_ms).to_datetime(),
        close_time: TimeMs::new(close_time_ms).to_datetime(),
        open_time_ms,
        close_time_ms,
    }
}

impl Repository {
    /// Insert a reconciled position unless `(symbol, open_time)` is already stored.
    ///
    /// Returns true if a new row was written.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn upsert_position(&self, position: &FormattedPosition) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(INSERT_POSITION_SQL)
            .bind(chrono::Utc::now().timestamp_millis())
            .bind(position.symbol.as_str())
            .bind(position.side.as_str())
            .bind(position.position_side.as_str())
            .bind(position.net_pnl.as_str())
            .bind(position.volume.as_str())
            .bind(position.open_time_ms)
            .bind(position.close_time_ms)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Upsert many positions in a single transaction.
    ///
    /// Returns the number of newly inserted rows (duplicates are skipped).
    ///
    /// # Errors
    /// Returns an error if the transaction fails; nothing is written then.
    pub async fn upsert_positions_batch(
        &self,
        positions: &[FormattedPosition],
    ) -> Result<usize, sqlx::Error> {
        if positions.is_empty() {
            return Ok(0);
        }

        let recorded_at = chrono::Utc::now().timestamp_millis();
        let mut inserted = 0usize;
        let mut tx = self.pool.begin().await?;

        for position in positions {
            let result = sqlx::query(INSERT_POSITION_SQL)
                .bind(recorded_at)
                .bind(position.symbol.as_str())
                .bind(position.side.as_str())
                .bind(position.position_side.as_str())
                .bind(position.net_pnl.as_str())
                .bind(position.volume.as_str())
                .bind(position.open_time_ms)
                .bind(position.close_time_ms)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Query stored positions by close time, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_positions(
        &self,
        symbol: Option<&Symbol>,
        from_ms: Option<TimeMs>,
        to_ms: Option<TimeMs>,
        limit: u32,
    ) -> Result<Vec<FormattedPosition>, sqlx::Error> {
        let from_ms = from_ms.unwrap_or(TimeMs::new(0)).as_ms();
        let to_ms = to_ms.unwrap_or(TimeMs::new(i64::MAX)).as_ms();

        let sql = if symbol.is_some() {
            r#"
            SELECT symbol, side, position_side, net_pnl, volume, open_time_ms, close_time_ms
            FROM position_history
            WHERE symbol = ? AND close_time_ms >= ? AND close_time_ms <= ?
            ORDER BY close_time_ms DESC, id DESC
            LIMIT ?
            "#
        } else {
            r#"
            SELECT symbol, side, position_side, net_pnl, volume, open_time_ms, close_time_ms
            FROM position_history
            WHERE close_time_ms >= ? AND close_time_ms <= ?
            ORDER BY close_time_ms DESC, id DESC
            LIMIT ?
            "#
        };

        let mut query = sqlx::query(sql);
        if let Some(symbol) = symbol {
            query = query.bind(symbol.as_str());
        }
        let rows = query
            .bind(from_ms)
            .bind(to_ms)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_position).collect())
    }

    /// Count stored positions for a symbol.
    pub async fn count_positions(&self, symbol: &Symbol) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM position_history WHERE symbol = ?")
            .bind(symbol.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n"))
    }
}
