//! Route registration.
//!
//! Routes mounted under `/api/v1`:
//!
//! ```text
//! /mining/start                   start session (POST)
//! /mining/status                  poll status, self-healing (GET)
//! /mining/sessions/{id}/complete  settle and credit (POST)
//!
//! /payments                       create intent (POST)
//! /payments/{id}                  fetch own payment (GET)
//! /payments/{id}/verify           verify against chain (POST)
//! /payments/{id}/cancel           pending -> failed (POST)
//! ```

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod mining;
pub mod payments;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/mining", mining::router())
        .nest("/payments", payments::router())
}
