//! Mining session model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use tonmine_core::types::{DbId, Timestamp};

/// A mining session row from the `mining_sessions` table.
///
/// `start_time`, `end_time`, `tokens_per_hour`, and `mining_power` are fixed
/// at creation; later changes to the user's settings do not affect an
/// in-flight session. `total_mined` is set exactly once, by the conditional
/// update that flips `is_active`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MiningSession {
    pub id: DbId,
    pub user_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub tokens_per_hour: f64,
    pub mining_power: i32,
    pub is_active: bool,
    pub completed_at: Option<Timestamp>,
    pub total_mined: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new mining session.
pub struct CreateMiningSession {
    pub user_id: DbId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub tokens_per_hour: f64,
    pub mining_power: i32,
}
