//! Handlers for the payment endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tonmine_core::error::CoreError;
use tonmine_core::types::DbId;
use tonmine_db::models::payment::PaymentResponse;
use tonmine_db::repositories::PaymentRepo;
use validator::Validate;

use crate::engine::payments::{self, VerifyOutcome};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::TelegramAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for creating a payment intent.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, max = 128))]
    pub destination_address: String,
    /// Expected transfer value in nanotons.
    #[validate(range(min = 1))]
    pub amount_nano: i64,
}

/// Request body for a verification attempt. Both fields are client-reported
/// and advisory; the chain match is authoritative.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub wallet_address: String,
}

/// Verification result payload.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerifyResponse {
    Confirmed {
        payment: PaymentResponse,
        token_balance: i64,
        usdt_balance: f64,
    },
    AlreadyConfirmed {
        payment: PaymentResponse,
    },
    Pending,
    Failed {
        payment: PaymentResponse,
    },
}

/// POST /api/v1/payments
///
/// Create a pending payment intent.
pub async fn create_payment(
    auth: TelegramAuth,
    State(state): State<AppState>,
    Json(input): Json<CreatePaymentRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let payment = payments::create_payment(
        &state,
        &auth.user,
        input.destination_address.trim(),
        input.amount_nano,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: PaymentResponse::from(payment),
        }),
    ))
}

/// GET /api/v1/payments/{id}
///
/// Fetch one of the caller's payments.
pub async fn get_payment(
    auth: TelegramAuth,
    State(state): State<AppState>,
    Path(payment_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let payment = PaymentRepo::find_by_id(&state.pool, payment_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Payment",
            id: payment_id,
        })?;

    if payment.user_id != auth.user.id {
        return Err(CoreError::Forbidden("payment belongs to another user".into()).into());
    }

    Ok(Json(DataResponse {
        data: PaymentResponse::from(payment),
    }))
}

/// POST /api/v1/payments/{id}/verify
///
/// Check the chain for a matching transaction; confirm and credit at most
/// once. `pending` means "not found yet, poll again later".
pub async fn verify_payment(
    auth: TelegramAuth,
    State(state): State<AppState>,
    Path(payment_id): Path<DbId>,
    Json(input): Json<VerifyPaymentRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = payments::verify_payment(
        &state,
        payment_id,
        &auth.user,
        &input.tx_hash,
        &input.wallet_address,
        Utc::now(),
    )
    .await?;

    let response = match outcome {
        VerifyOutcome::Confirmed { payment, balances } => VerifyResponse::Confirmed {
            payment: PaymentResponse::from(payment),
            token_balance: balances.token_balance,
            usdt_balance: balances.usdt_balance,
        },
        VerifyOutcome::AlreadyConfirmed { payment } => VerifyResponse::AlreadyConfirmed {
            payment: PaymentResponse::from(payment),
        },
        VerifyOutcome::Pending => VerifyResponse::Pending,
        VerifyOutcome::Failed { payment } => VerifyResponse::Failed {
            payment: PaymentResponse::from(payment),
        },
    };

    Ok(Json(DataResponse { data: response }))
}

/// POST /api/v1/payments/{id}/cancel
///
/// Explicitly fail a pending payment.
pub async fn cancel_payment(
    auth: TelegramAuth,
    State(state): State<AppState>,
    Path(payment_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let payment = payments::cancel_payment(&state, payment_id, &auth.user).await?;
    Ok(Json(DataResponse {
        data: PaymentResponse::from(payment),
    }))
}
