//! Handlers for the mining session endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tonmine_core::types::DbId;
use tonmine_db::models::mining_session::MiningSession;

use crate::engine::mining::{self, CompleteOutcome};
use crate::error::AppResult;
use crate::middleware::auth::TelegramAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// Completion result payload.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompleteResponse {
    Completed {
        session: MiningSession,
        reward: i64,
        token_balance: i64,
        usdt_balance: f64,
    },
    AlreadyCompleted {
        session: MiningSession,
    },
}

/// POST /api/v1/mining/start
///
/// Start a session, or return the running one unchanged.
pub async fn start_session(
    auth: TelegramAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let session = mining::start_session(&state, &auth.user, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: session })))
}

/// GET /api/v1/mining/status
///
/// Current session, or `null`. An expired session is settled as a side
/// effect and returned in its completed form.
pub async fn get_status(
    auth: TelegramAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let session = mining::poll_status(&state, &auth.user, Utc::now()).await?;
    Ok(Json(DataResponse { data: session }))
}

/// POST /api/v1/mining/sessions/{id}/complete
///
/// Settle the session and credit the reward, exactly once.
pub async fn complete_session(
    auth: TelegramAuth,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let outcome = mining::complete_session(&state, session_id, &auth.user, Utc::now()).await?;

    let response = match outcome {
        CompleteOutcome::Completed {
            session,
            reward,
            balances,
        } => CompleteResponse::Completed {
            session,
            reward,
            token_balance: balances.token_balance,
            usdt_balance: balances.usdt_balance,
        },
        CompleteOutcome::AlreadyCompleted { session } => {
            CompleteResponse::AlreadyCompleted { session }
        }
    };

    Ok(Json(DataResponse { data: response }))
}
