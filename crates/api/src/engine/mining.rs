//! Session lifecycle: start, poll, and settlement.
//!
//! Settlement is a single path shared by explicit completion, the
//! self-healing status poll, session restart, and the background sweeper.
//! The reward is computed from the server clock before the conditional
//! update, and the update plus the ledger credit commit in one database
//! transaction: of any number of concurrent attempts, exactly one credits.

use std::time::{Duration, Instant};

use tonmine_core::accrual;
use tonmine_core::error::CoreError;
use tonmine_core::types::{DbId, Timestamp};
use tonmine_db::models::mining_session::{CreateMiningSession, MiningSession};
use tonmine_db::models::user::{Balances, User};
use tonmine_db::repositories::{MiningSessionRepo, UserRepo};

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::state::AppState;

/// Result of an explicit completion request.
#[derive(Debug)]
pub enum CompleteOutcome {
    /// This call won the settlement and credited the reward.
    Completed {
        session: MiningSession,
        reward: i64,
        balances: Balances,
    },
    /// The session was already settled; nothing was credited by this call.
    AlreadyCompleted { session: MiningSession },
}

/// Result of the shared settlement path.
pub struct Settlement {
    pub session: MiningSession,
    pub reward: i64,
    pub balances: Balances,
}

/// Start a mining session for `user`.
///
/// Idempotent: a still-running session is returned unchanged. An expired
/// active session is settled first (same path as explicit completion), then
/// a new session starts with the user's current rate, power, and duration.
pub async fn start_session(
    state: &AppState,
    user: &User,
    now: Timestamp,
) -> AppResult<MiningSession> {
    if let Some(existing) = MiningSessionRepo::find_active_for_user(&state.pool, user.id).await? {
        if existing.end_time > now {
            return Ok(existing);
        }
        // Overdue: settle before starting fresh. Losing the settlement race
        // is fine, the slot is free either way.
        settle(state, &existing, now).await?;
    }

    let input = CreateMiningSession {
        user_id: user.id,
        start_time: now,
        end_time: now + chrono::Duration::hours(i64::from(user.mining_duration_hours)),
        tokens_per_hour: user.tokens_per_hour,
        mining_power: user.mining_power,
    };

    match MiningSessionRepo::create(&state.pool, &input).await {
        Ok(session) => {
            tracing::info!(
                session_id = session.id,
                user_id = user.id,
                end_time = %session.end_time,
                "Mining session started"
            );
            Ok(session)
        }
        Err(e) if is_unique_violation(&e, "uq_mining_sessions_active_user") => {
            // Lost a concurrent start race; the winner's session is the one
            // to return (idempotent start, no second row).
            MiningSessionRepo::find_active_for_user(&state.pool, user.id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError("active session vanished after start race".into())
                })
        }
        Err(e) => Err(e.into()),
    }
}

/// Current session status for `user`.
///
/// A still-running session is returned as-is. An expired session that is
/// still marked active is settled as a side effect (read-triggered state
/// transition) and the completed row is returned -- the system never
/// requires a client to explicitly close out an expired session.
pub async fn poll_status(
    state: &AppState,
    user: &User,
    now: Timestamp,
) -> AppResult<Option<MiningSession>> {
    let Some(session) = MiningSessionRepo::find_active_for_user(&state.pool, user.id).await? else {
        return Ok(None);
    };

    if session.end_time > now {
        return Ok(Some(session));
    }

    match settle(state, &session, now).await? {
        Some(settlement) => Ok(Some(settlement.session)),
        // A concurrent call settled it first; surface the final row.
        None => Ok(MiningSessionRepo::find_by_id(&state.pool, session.id).await?),
    }
}

/// Explicitly complete a session on behalf of `user`.
///
/// The owner check is fatal; a duplicate call reports
/// [`CompleteOutcome::AlreadyCompleted`] without re-crediting; request
/// storms against a still-active session are throttled per session id.
pub async fn complete_session(
    state: &AppState,
    session_id: DbId,
    user: &User,
    now: Timestamp,
) -> AppResult<CompleteOutcome> {
    let session = MiningSessionRepo::find_by_id(&state.pool, session_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "MiningSession",
            id: session_id,
        })?;

    if session.user_id != user.id {
        return Err(CoreError::Forbidden("session belongs to another user".into()).into());
    }

    if !session.is_active {
        return Ok(CompleteOutcome::AlreadyCompleted { session });
    }

    let cooldown = Duration::from_secs(state.config.mining_complete_cooldown_secs);
    if !state
        .limits
        .complete_cooldown
        .try_acquire(session.id, Instant::now(), cooldown)
    {
        // The throttle may fire on the loser of a settlement race; if the
        // winner already settled, report that instead of an error.
        if let Some(settled) = MiningSessionRepo::find_by_id(&state.pool, session.id).await? {
            if !settled.is_active {
                return Ok(CompleteOutcome::AlreadyCompleted { session: settled });
            }
        }
        return Err(CoreError::RateLimited("completion attempted too soon".into()).into());
    }

    match settle(state, &session, now).await? {
        Some(settlement) => Ok(CompleteOutcome::Completed {
            session: settlement.session,
            reward: settlement.reward,
            balances: settlement.balances,
        }),
        None => {
            let session = MiningSessionRepo::find_by_id(&state.pool, session.id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError("session vanished during settlement".into())
                })?;
            Ok(CompleteOutcome::AlreadyCompleted { session })
        }
    }
}

/// Settle a session: compute the reward, flip the session atomically, and
/// credit the ledger -- all or nothing.
///
/// Returns `None` if a concurrent caller already settled it. The reward
/// uses only the session row's fixed parameters and the server clock; the
/// accrual sanity bound aborts settlement instead of overpaying.
pub async fn settle(
    state: &AppState,
    session: &MiningSession,
    now: Timestamp,
) -> AppResult<Option<Settlement>> {
    let reward = accrual::compute(
        session.start_time,
        session.end_time,
        now,
        session.tokens_per_hour,
        session.mining_power,
    )?;
    let usdt_delta = reward as f64 * state.config.usdt_per_token;

    let mut tx = state.pool.begin().await?;

    let Some(settled) = MiningSessionRepo::complete(&mut *tx, session.id, now, reward).await?
    else {
        tx.rollback().await?;
        return Ok(None);
    };

    let balances =
        UserRepo::credit_mining_reward(&mut *tx, session.user_id, reward, usdt_delta).await?;

    tx.commit().await?;

    tracing::info!(
        session_id = session.id,
        user_id = session.user_id,
        reward,
        token_balance = balances.token_balance,
        "Mining session settled"
    );

    // Fire-and-forget; delivery can never affect settlement.
    if let Ok(Some(owner)) = UserRepo::find_by_id(&state.pool, session.user_id).await {
        state.notifier.notify(
            owner.telegram_id,
            format!("Mining complete! You earned {reward} tokens."),
        );
    }

    Ok(Some(Settlement {
        session: settled,
        reward,
        balances,
    }))
}
