//! Payment verification and the replay guard.
//!
//! A payment confirms only when the chain indexer independently shows a
//! transaction of the expected value to the expected address inside the
//! verification window. Client-supplied hashes and wallet addresses are
//! advisory: they feed the fast-path replay checks and diagnostics, but the
//! hash that gets persisted is the one matched on chain.
//!
//! Replay protection is two-tier: an in-process cache (latency only) and
//! the durable lookup + partial unique index on `payments.tx_hash` (the
//! actual guarantee).

use std::time::{Duration, Instant};

use tonmine_core::error::CoreError;
use tonmine_core::payment_match::{self, CandidateTx};
use tonmine_core::types::{DbId, Timestamp};
use tonmine_core::wallet;
use tonmine_db::models::payment::{CreatePayment, Payment};
use tonmine_db::models::status::PaymentStatus;
use tonmine_db::models::user::{Balances, User};
use tonmine_db::repositories::{PaymentRepo, UserRepo};

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::state::AppState;

/// Nanotons per TON.
const NANO_PER_TON: f64 = 1_000_000_000.0;

/// Result of a verification attempt.
pub enum VerifyOutcome {
    /// This call matched a chain transaction and credited the account.
    Confirmed { payment: Payment, balances: Balances },
    /// The payment was already confirmed; idempotent success, no credit.
    AlreadyConfirmed { payment: Payment },
    /// No matching transaction yet -- a recoverable state, poll again later.
    Pending,
    /// The payment was cancelled or otherwise terminally failed.
    Failed { payment: Payment },
}

/// Create a pending payment intent for `user`.
pub async fn create_payment(
    state: &AppState,
    user: &User,
    destination_address: &str,
    amount_nano: i64,
) -> AppResult<Payment> {
    wallet::validate_address(destination_address)?;
    if amount_nano <= 0 {
        return Err(CoreError::Validation("amount must be positive".into()).into());
    }

    let payment = PaymentRepo::create(
        &state.pool,
        &CreatePayment {
            user_id: user.id,
            destination_address: destination_address.to_string(),
            amount_nano,
        },
    )
    .await?;

    tracing::info!(
        payment_id = payment.id,
        user_id = user.id,
        amount_nano,
        "Payment intent created"
    );

    Ok(payment)
}

/// Verify a payment against the chain and confirm it at most once.
///
/// See the module docs for the trust and replay model. Indexer failures and
/// missing matches both surface as [`VerifyOutcome::Pending`].
pub async fn verify_payment(
    state: &AppState,
    payment_id: DbId,
    user: &User,
    claimed_tx_hash: &str,
    claimed_wallet: &str,
    now: Timestamp,
) -> AppResult<VerifyOutcome> {
    let payment = PaymentRepo::find_by_id(&state.pool, payment_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Payment",
            id: payment_id,
        })?;

    if payment.user_id != user.id {
        return Err(CoreError::Forbidden("payment belongs to another user".into()).into());
    }

    match payment.status() {
        Some(PaymentStatus::Confirmed) => {
            return Ok(VerifyOutcome::AlreadyConfirmed { payment });
        }
        Some(PaymentStatus::Failed) => {
            return Ok(VerifyOutcome::Failed { payment });
        }
        Some(PaymentStatus::Pending) => {}
        None => {
            return Err(AppError::InternalError(format!(
                "payment {} has unknown status id {}",
                payment.id, payment.status_id
            )));
        }
    }

    let window = Duration::from_secs(state.config.payment_verify_window_secs);
    if !state.limits.verify_attempts.try_acquire(
        user.id,
        Instant::now(),
        window,
        state.config.payment_verify_max_attempts,
    ) {
        return Err(CoreError::RateLimited("too many verification attempts".into()).into());
    }

    // Advisory inputs: useful for early rejection and diagnostics only.
    tracing::debug!(
        payment_id = payment.id,
        claimed_tx_hash,
        claimed_wallet,
        "Verification attempt"
    );

    let claimed = claimed_tx_hash.trim();
    if !claimed.is_empty() {
        reject_if_hash_taken(state, claimed, payment.id).await?;
    }

    // The indexer is eventually consistent and occasionally unavailable;
    // either way the payment simply stays pending.
    let transactions = match state
        .chain
        .recent_transactions(&payment.destination_address)
        .await
    {
        Ok(txs) => txs,
        Err(e) => {
            tracing::warn!(
                payment_id = payment.id,
                error = %e,
                "Indexer unavailable, verification stays pending"
            );
            return Ok(VerifyOutcome::Pending);
        }
    };

    let candidates: Vec<CandidateTx> = transactions.iter().map(CandidateTx::from).collect();
    let Some(matched) = payment_match::find_match(
        &candidates,
        payment.amount_nano,
        state.config.payment_tolerance_nano,
        payment.created_at,
        state.config.payment_window_secs,
    ) else {
        return Ok(VerifyOutcome::Pending);
    };
    let matched_hash = matched.hash.clone();

    // The matched hash is what gets persisted; guard it the same way.
    reject_if_hash_taken(state, &matched_hash, payment.id).await?;

    let usdt_delta = payment.amount_nano as f64 / NANO_PER_TON * state.config.usdt_per_ton;

    let mut tx = state.pool.begin().await?;

    let confirmed = match PaymentRepo::confirm(&mut *tx, payment.id, &matched_hash, now).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            // A concurrent call confirmed (or cancelled) first.
            tx.rollback().await?;
            let current = PaymentRepo::find_by_id(&state.pool, payment.id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError("payment vanished during verification".into())
                })?;
            return Ok(match current.status() {
                Some(PaymentStatus::Failed) => VerifyOutcome::Failed { payment: current },
                _ => VerifyOutcome::AlreadyConfirmed { payment: current },
            });
        }
        Err(e) if is_unique_violation(&e, "uq_payments_tx_hash") => {
            // Raced against a confirmation of another payment with the same
            // hash; the index is the authoritative replay guard.
            state.limits.replay.insert(&matched_hash);
            tracing::error!(
                payment_id = payment.id,
                tx_hash = %matched_hash,
                "Transaction hash already credited elsewhere"
            );
            return Err(CoreError::Conflict("transaction already used".into()).into());
        }
        Err(e) => return Err(e.into()),
    };

    let balances = UserRepo::credit_payment(&mut *tx, user.id, usdt_delta).await?;

    tx.commit().await?;

    state.limits.replay.insert(&matched_hash);

    tracing::info!(
        payment_id = payment.id,
        user_id = user.id,
        tx_hash = %matched_hash,
        usdt_delta,
        "Payment confirmed and credited"
    );

    state.notifier.notify(
        user.telegram_id,
        format!(
            "Payment of {:.2} TON confirmed.",
            payment.amount_nano as f64 / NANO_PER_TON
        ),
    );

    Ok(VerifyOutcome::Confirmed {
        payment: confirmed,
        balances,
    })
}

/// Explicit failure signal: cancel a pending payment.
///
/// Returns the final row. A payment that is not pending anymore is a
/// conflict, not a silent success -- confirmed and failed are terminal.
pub async fn cancel_payment(state: &AppState, payment_id: DbId, user: &User) -> AppResult<Payment> {
    let payment = PaymentRepo::find_by_id(&state.pool, payment_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Payment",
            id: payment_id,
        })?;

    if payment.user_id != user.id {
        return Err(CoreError::Forbidden("payment belongs to another user".into()).into());
    }

    if !PaymentRepo::mark_failed(&state.pool, payment.id).await? {
        return Err(CoreError::Conflict("payment is not pending".into()).into());
    }

    tracing::info!(payment_id = payment.id, user_id = user.id, "Payment cancelled");

    PaymentRepo::find_by_id(&state.pool, payment.id)
        .await?
        .ok_or_else(|| AppError::InternalError("payment vanished after cancel".into()))
}

/// Both replay-guard lookup layers for a single hash.
///
/// The caller's payment is still pending, so its own `tx_hash` is unset; a
/// cached hash therefore always belongs to some other payment and the cache
/// can reject without touching the database. The durable row lookup is the
/// authoritative layer; `own_id` exempts the payment being verified.
async fn reject_if_hash_taken(state: &AppState, hash: &str, own_id: DbId) -> AppResult<()> {
    if state.limits.replay.contains(hash) {
        return Err(CoreError::Conflict("transaction already used".into()).into());
    }

    if let Some(other) = PaymentRepo::find_by_tx_hash(&state.pool, hash).await? {
        if other.id != own_id {
            state.limits.replay.insert(hash);
            return Err(CoreError::Conflict("transaction already used".into()).into());
        }
    }
    Ok(())
}
