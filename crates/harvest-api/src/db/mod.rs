//! # Database Persistence Layer
//!
//! Postgres persistence for batch records via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set the service
//! stores batches in the `batches` table; otherwise it falls back to the
//! file store (`HARVEST_DATA_DIR`) or to memory.

pub mod batches;

pub use batches::PgRecordStore;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect to Postgres and run the embedded migrations.
pub async fn init_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}
