//! Repository for the `mining_sessions` table.
//!
//! The `is_active` flag is only ever flipped by [`MiningSessionRepo::complete`],
//! a conditional update that doubles as the concurrency guard: of any number
//! of concurrent settlement attempts, exactly one sees the row.

use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use tonmine_core::types::{DbId, Timestamp};

use crate::models::mining_session::{CreateMiningSession, MiningSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, start_time, end_time, tokens_per_hour, \
                        mining_power, is_active, completed_at, total_mined, \
                        created_at, updated_at";

/// Provides persistence for mining sessions.
pub struct MiningSessionRepo;

impl MiningSessionRepo {
    /// Insert a new active session, returning the created row.
    ///
    /// Fails with a unique violation on `uq_mining_sessions_active_user` if
    /// the user already has an active session — callers treat that as losing
    /// a start race, not as corruption.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMiningSession,
    ) -> Result<MiningSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO mining_sessions
                 (user_id, start_time, end_time, tokens_per_hour, mining_power)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MiningSession>(&query)
            .bind(input.user_id)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.tokens_per_hour)
            .bind(input.mining_power)
            .fetch_one(pool)
            .await
    }

    /// Find a session by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MiningSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM mining_sessions WHERE id = $1");
        sqlx::query_as::<_, MiningSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the user's active session, if any.
    pub async fn find_active_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<MiningSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM mining_sessions
             WHERE user_id = $1 AND is_active = TRUE"
        );
        sqlx::query_as::<_, MiningSession>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically settle a session: flip `is_active`, stamp `completed_at`,
    /// and write `total_mined` exactly once.
    ///
    /// Returns `None` if the session was not active anymore — a concurrent
    /// call already settled it and this caller must not credit anything.
    pub async fn complete(
        executor: impl PgExecutor<'_>,
        session_id: DbId,
        completed_at: Timestamp,
        total_mined: i64,
    ) -> Result<Option<MiningSession>, sqlx::Error> {
        let query = format!(
            "UPDATE mining_sessions
             SET is_active = FALSE,
                 completed_at = $2,
                 total_mined = $3,
                 updated_at = NOW()
             WHERE id = $1 AND is_active = TRUE
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MiningSession>(&query)
            .bind(session_id)
            .bind(completed_at)
            .bind(total_mined)
            .fetch_optional(executor)
            .await
    }

    /// Active sessions whose scheduled end has passed, oldest first.
    /// Used by the background sweeper.
    pub async fn list_overdue(
        pool: &PgPool,
        now: Timestamp,
        limit: i64,
    ) -> Result<Vec<MiningSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM mining_sessions
             WHERE is_active = TRUE AND end_time <= $1
             ORDER BY end_time ASC
             LIMIT $2"
        );
        sqlx::query_as::<_, MiningSession>(&query)
            .bind(now)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
