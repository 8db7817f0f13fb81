//! Repository for the `users` table.

use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use tonmine_core::types::DbId;

use crate::models::user::{Balances, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, telegram_id, username, token_balance, usdt_balance, \
                        mining_power, tokens_per_hour, mining_duration_hours, \
                        notifications_blocked, created_at, updated_at";

/// Provides account lookup and the ledger-credit operations.
///
/// The credit methods are the only writers of the balance columns and are
/// intended to run on the same transaction connection as the CAS that
/// settles a session or confirms a payment.
pub struct UserRepo;

impl UserRepo {
    /// Insert or refresh a user keyed by Telegram id, returning the row.
    ///
    /// Called on every authenticated request; an existing row only has its
    /// username refreshed.
    pub async fn upsert_telegram(
        pool: &PgPool,
        telegram_id: i64,
        username: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (telegram_id, username)
             VALUES ($1, $2)
             ON CONFLICT (telegram_id) DO UPDATE
                 SET username = COALESCE(EXCLUDED.username, users.username),
                     updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(telegram_id)
            .bind(username)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by Telegram ID.
    pub async fn find_by_telegram_id(
        pool: &PgPool,
        telegram_id: i64,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE telegram_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(telegram_id)
            .fetch_optional(pool)
            .await
    }

    /// Credit a settled mining reward: whole tokens plus the derived
    /// secondary-currency delta, written together. Returns both balances.
    pub async fn credit_mining_reward(
        executor: impl PgExecutor<'_>,
        user_id: DbId,
        tokens: i64,
        usdt_delta: f64,
    ) -> Result<Balances, sqlx::Error> {
        sqlx::query_as::<_, Balances>(
            "UPDATE users
             SET token_balance = token_balance + $2,
                 usdt_balance = usdt_balance + $3,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING token_balance, usdt_balance",
        )
        .bind(user_id)
        .bind(tokens)
        .bind(usdt_delta)
        .fetch_one(executor)
        .await
    }

    /// Credit a confirmed deposit. Returns both balances.
    pub async fn credit_payment(
        executor: impl PgExecutor<'_>,
        user_id: DbId,
        usdt_delta: f64,
    ) -> Result<Balances, sqlx::Error> {
        sqlx::query_as::<_, Balances>(
            "UPDATE users
             SET usdt_balance = usdt_balance + $2,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING token_balance, usdt_balance",
        )
        .bind(user_id)
        .bind(usdt_delta)
        .fetch_one(executor)
        .await
    }

    /// Flag a user whose chat permanently rejects bot messages.
    /// Returns `true` if a row was updated.
    pub async fn set_notifications_blocked(
        pool: &PgPool,
        telegram_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users
             SET notifications_blocked = TRUE, updated_at = NOW()
             WHERE telegram_id = $1 AND notifications_blocked = FALSE",
        )
        .bind(telegram_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
