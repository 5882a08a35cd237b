//! Position store backed by SQLite.
//!
//! This module provides:
//! - Database initialization and schema migrations
//! - Repository with the idempotent position upsert and the run log

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
