//! Periodic settlement of overdue mining sessions.
//!
//! Clients normally trigger settlement by polling or completing, but a
//! client that disappears must not leave a session active forever. This
//! task sweeps overdue sessions through the exact same settlement path on
//! a fixed interval, so the reward logic stays in one place.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tonmine_db::repositories::MiningSessionRepo;

use crate::engine::mining;
use crate::state::AppState;

/// Overdue sessions settled per sweep.
const SWEEP_BATCH_SIZE: i64 = 100;

/// Run the sweeper loop until `cancel` is triggered.
pub async fn run(state: AppState, cancel: CancellationToken) {
    let interval = Duration::from_secs(state.config.session_sweep_interval_secs);
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Session sweeper started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = sweep_once(&state).await {
                    tracing::error!(error = %e, "Session sweep failed");
                }
            }
        }
    }
}

/// Settle one batch of overdue sessions. Losing a settlement race to a
/// concurrent poll or completion is expected and harmless.
pub async fn sweep_once(state: &AppState) -> Result<(), crate::error::AppError> {
    let now = Utc::now();
    let overdue = MiningSessionRepo::list_overdue(&state.pool, now, SWEEP_BATCH_SIZE).await?;

    if overdue.is_empty() {
        tracing::debug!("Session sweep: nothing overdue");
        return Ok(());
    }

    let mut settled = 0usize;
    for session in &overdue {
        match mining::settle(state, session, now).await {
            Ok(Some(_)) => settled += 1,
            Ok(None) => {}
            Err(e) => {
                // Keep sweeping; one bad session must not block the rest.
                tracing::error!(
                    session_id = session.id,
                    error = %e,
                    "Failed to settle overdue session"
                );
            }
        }
    }

    tracing::info!(
        overdue = overdue.len(),
        settled,
        "Session sweep finished"
    );
    Ok(())
}
