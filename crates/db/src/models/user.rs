//! User entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use tonmine_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub token_balance: i64,
    pub usdt_balance: f64,
    pub mining_power: i32,
    pub tokens_per_hour: f64,
    pub mining_duration_hours: i32,
    pub notifications_blocked: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Both balances after a ledger credit, read back inside the crediting
/// transaction.
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct Balances {
    pub token_balance: i64,
    pub usdt_balance: f64,
}
