//! Persistence layer for the tonmine backend.
//!
//! PostgreSQL via sqlx: connection pool construction, embedded migrations,
//! `FromRow` models, and zero-sized repository structs. All state-machine
//! transitions (`is_active`, payment status) go through the conditional
//! updates in [`repositories`]; no other code path may flip them.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod models;
pub mod repositories;

/// Shared alias so callers don't import sqlx directly for the pool type.
pub type DbPool = PgPool;

/// Maximum connections in the pool.
const MAX_CONNECTIONS: u32 = 10;

/// How long to wait for a connection before failing.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a connection pool against `database_url`.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// Cheap connectivity probe used by startup and the health endpoint.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply embedded migrations from `crates/db/migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
