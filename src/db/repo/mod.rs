//! Repository layer for database operations.
//!
//! Methods are organized across submodules by table:
//! - `positions.rs` - reconciled position history (the idempotent upsert)
//! - `runs.rs` - reconciliation run log

mod positions;
mod runs;

use sqlx::sqlite::SqlitePool;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Cheap connectivity probe used by the readiness endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
