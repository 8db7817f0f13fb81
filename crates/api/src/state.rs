use std::sync::Arc;

use tonmine_chain::TransactionSource;
use tonmine_core::ratelimit::{AttemptWindow, CooldownMap};
use tonmine_core::replay::ReplayCache;
use tonmine_telegram::Notifier;

use crate::config::ServerConfig;

/// In-process throttle and replay state.
///
/// Best-effort only: lost on restart, not shared across instances. The
/// durable CAS transitions and unique indexes are the actual guarantees.
#[derive(Default)]
pub struct RateLimits {
    /// Per-session settlement cooldown.
    pub complete_cooldown: CooldownMap,
    /// Per-user payment-verification attempt window.
    pub verify_attempts: AttemptWindow,
    /// Fast-path transaction-hash cache (replay guard layer 1).
    pub replay: ReplayCache,
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: tonmine_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Chain indexer; trait object so tests can substitute a fake.
    pub chain: Arc<dyn TransactionSource>,
    /// Outbound Telegram messaging handle.
    pub notifier: Notifier,
    /// Throttles and the replay fast path.
    pub limits: Arc<RateLimits>,
}
