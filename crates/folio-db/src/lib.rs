//! Folio Database Layer
//!
//! Postgres persistence for editions and attachments, the transaction guard,
//! pool setup and embedded schema migrations.

pub mod db;

use std::time::Duration;

use folio_core::AppError;
use sqlx::postgres::PgPoolOptions;
pub use db::*;
pub use sqlx::PgPool;

/// Open a connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to run migrations: {}", e)))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
