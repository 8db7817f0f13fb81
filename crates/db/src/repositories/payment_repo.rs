//! Repository for the `payments` table.
//!
//! Status transitions are conditional updates guarded on the pending state;
//! the partial unique index on `tx_hash` is the durable replay guard.

use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use tonmine_core::types::{DbId, Timestamp};

use crate::models::payment::{CreatePayment, Payment};
use crate::models::status::PaymentStatus;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, destination_address, amount_nano, status_id, \
                        tx_hash, created_at, confirmed_at, updated_at";

/// Provides persistence for payment records.
pub struct PaymentRepo;

impl PaymentRepo {
    /// Insert a new pending payment intent, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreatePayment) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments (user_id, destination_address, amount_nano, status_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(input.user_id)
            .bind(&input.destination_address)
            .bind(input.amount_nano)
            .bind(PaymentStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Find a payment by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE id = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the payment already carrying `tx_hash`, if any.
    ///
    /// Durable half of the replay guard's lookup path; the unique index
    /// still backs the race at commit time.
    pub async fn find_by_tx_hash(
        pool: &PgPool,
        tx_hash: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE tx_hash = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(tx_hash)
            .fetch_optional(pool)
            .await
    }

    /// Atomically confirm a pending payment, recording the matched on-chain
    /// transaction hash.
    ///
    /// Returns `None` if the payment was not pending anymore — a concurrent
    /// call already confirmed (or failed) it and this caller must not credit
    /// anything. A unique violation on `uq_payments_tx_hash` means the hash
    /// already confirmed a different payment.
    pub async fn confirm(
        executor: impl PgExecutor<'_>,
        payment_id: DbId,
        tx_hash: &str,
        confirmed_at: Timestamp,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!(
            "UPDATE payments
             SET status_id = $2,
                 tx_hash = $3,
                 confirmed_at = $4,
                 updated_at = NOW()
             WHERE id = $1 AND status_id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(payment_id)
            .bind(PaymentStatus::Confirmed.id())
            .bind(tx_hash)
            .bind(confirmed_at)
            .bind(PaymentStatus::Pending.id())
            .fetch_optional(executor)
            .await
    }

    /// Explicit failure signal: transition a pending payment to failed.
    /// Returns `true` if the row was updated, `false` if it was already
    /// terminal.
    pub async fn mark_failed(pool: &PgPool, payment_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE payments
             SET status_id = $2, updated_at = NOW()
             WHERE id = $1 AND status_id = $3",
        )
        .bind(payment_id)
        .bind(PaymentStatus::Failed.id())
        .bind(PaymentStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
