//! Route definitions for the `/mining` resource.
//!
//! All endpoints require Telegram initData authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::mining;
use crate::state::AppState;

/// Routes mounted at `/mining`.
///
/// ```text
/// POST   /start                    -> start_session
/// GET    /status                   -> get_status
/// POST   /sessions/{id}/complete   -> complete_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(mining::start_session))
        .route("/status", get(mining::get_status))
        .route("/sessions/{id}/complete", post(mining::complete_session))
}
