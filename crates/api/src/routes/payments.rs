//! Route definitions for the `/payments` resource.
//!
//! All endpoints require Telegram initData authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::payments;
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// POST   /                -> create_payment
/// GET    /{id}            -> get_payment
/// POST   /{id}/verify     -> verify_payment
/// POST   /{id}/cancel     -> cancel_payment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(payments::create_payment))
        .route("/{id}", get(payments::get_payment))
        .route("/{id}/verify", post(payments::verify_payment))
        .route("/{id}/cancel", post(payments::cancel_payment))
}
