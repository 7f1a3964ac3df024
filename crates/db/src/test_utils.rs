//! Test utilities for database operations.
//!
//! Provides an in-memory SQLite database with the full migration set applied,
//! so stateful service tests run without external infrastructure.

use crate::migrations::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

/// Create an in-memory SQLite database with all migrations applied.
///
/// The pool is pinned to a single connection: each SQLite `:memory:`
/// connection is its own database, so a larger pool would hand out
/// empty databases.
pub async fn memory_db() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:");

    opt.max_connections(1)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(3600))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    let conn = Database::connect(opt).await?;
    Migrator::up(&conn, None).await?;
    Ok(conn)
}
