//! HTTP-level integration tests for the mining session lifecycle.
//!
//! Covers idempotent start, self-healing status polls, exactly-once
//! settlement (sequential and concurrent), authorization, and accrual
//! amounts end to end.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{build_test_state, build_test_app, expect_json, get, post_json, post_unauthenticated, test_config, FakeChain};
use sqlx::PgPool;
use tonmine_api::engine::mining::{self, CompleteOutcome};
use tonmine_api::error::AppError;
use tonmine_core::error::CoreError;
use tonmine_db::models::mining_session::{CreateMiningSession, MiningSession};
use tonmine_db::models::user::User;
use tonmine_db::repositories::{MiningSessionRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Upsert a user and pin the session parameters used by the scenarios.
async fn seed_user(pool: &PgPool, telegram_id: i64, rate: f64, power: i32) -> User {
    let user = UserRepo::upsert_telegram(pool, telegram_id, Some("tester"))
        .await
        .expect("user upsert should succeed");
    sqlx::query("UPDATE users SET tokens_per_hour = $2, mining_power = $3 WHERE id = $1")
        .bind(user.id)
        .bind(rate)
        .bind(power)
        .execute(pool)
        .await
        .expect("user update should succeed");
    UserRepo::find_by_id(pool, user.id).await.unwrap().unwrap()
}

/// Insert a session that ended `minutes_ago` minutes ago, still active.
async fn seed_expired_session(
    pool: &PgPool,
    user: &User,
    hours: i64,
    minutes_ago: i64,
) -> MiningSession {
    let end = Utc::now() - Duration::minutes(minutes_ago);
    MiningSessionRepo::create(
        pool,
        &CreateMiningSession {
            user_id: user.id,
            start_time: end - Duration::hours(hours),
            end_time: end,
            tokens_per_hour: user.tokens_per_hour,
            mining_power: user.mining_power,
        },
    )
    .await
    .expect("session creation should succeed")
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// Starting with no prior session creates one from the user's settings.
#[sqlx::test(migrations = "../db/migrations")]
async fn start_creates_session(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(app, "/api/v1/mining/start", 10, serde_json::json!({})).await;
    let json = expect_json(response, StatusCode::CREATED).await;

    let session = &json["data"];
    assert_eq!(session["is_active"], true);
    assert_eq!(session["tokens_per_hour"], 10.0);
    assert_eq!(session["mining_power"], 1);
    assert!(session["total_mined"].is_null());
}

/// A second start before the first session ends returns the same session;
/// no second row is created.
#[sqlx::test(migrations = "../db/migrations")]
async fn start_is_idempotent(pool: PgPool) {
    let app = build_test_app(pool.clone());

    let first = post_json(app.clone(), "/api/v1/mining/start", 11, serde_json::json!({})).await;
    let first_json = expect_json(first, StatusCode::CREATED).await;

    let second = post_json(app, "/api/v1/mining/start", 11, serde_json::json!({})).await;
    let second_json = expect_json(second, StatusCode::CREATED).await;

    assert_eq!(first_json["data"]["id"], second_json["data"]["id"]);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mining_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

/// Starting over an expired active session settles it first, then creates
/// a fresh one.
#[sqlx::test(migrations = "../db/migrations")]
async fn start_settles_expired_session_first(pool: PgPool) {
    let user = seed_user(&pool, 12, 1.0, 2).await;
    let expired = seed_expired_session(&pool, &user, 4, 1).await;

    let app = build_test_app(pool.clone());
    let response = post_json(app, "/api/v1/mining/start", 12, serde_json::json!({})).await;
    let json = expect_json(response, StatusCode::CREATED).await;

    // New session, old one settled with its reward credited.
    assert_ne!(json["data"]["id"], expired.id);
    let old = MiningSessionRepo::find_by_id(&pool, expired.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!old.is_active);
    assert_eq!(old.total_mined, Some(8));

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.token_balance, 8);
}

/// Requests without the initData header are rejected.
#[sqlx::test(migrations = "../db/migrations")]
async fn unauthenticated_request_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_unauthenticated(app, "/api/v1/mining/start").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// No session means a null status, not an error.
#[sqlx::test(migrations = "../db/migrations")]
async fn status_without_session_is_null(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(app, "/api/v1/mining/status", 20).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert!(json["data"].is_null());
}

/// A running session is returned unchanged.
#[sqlx::test(migrations = "../db/migrations")]
async fn status_returns_running_session(pool: PgPool) {
    let app = build_test_app(pool);

    let started = post_json(app.clone(), "/api/v1/mining/start", 21, serde_json::json!({})).await;
    let started_json = expect_json(started, StatusCode::CREATED).await;

    let response = get(app, "/api/v1/mining/status", 21).await;
    let json = expect_json(response, StatusCode::OK).await;

    assert_eq!(json["data"]["id"], started_json["data"]["id"]);
    assert_eq!(json["data"]["is_active"], true);
}

/// Polling an expired session settles it as a side effect: the client is
/// never required to explicitly close out an expired session.
#[sqlx::test(migrations = "../db/migrations")]
async fn status_self_heals_expired_session(pool: PgPool) {
    let user = seed_user(&pool, 22, 1.0, 2).await;
    seed_expired_session(&pool, &user, 4, 1).await;

    let app = build_test_app(pool.clone());
    let response = get(app, "/api/v1/mining/status", 22).await;
    let json = expect_json(response, StatusCode::OK).await;

    assert_eq!(json["data"]["is_active"], false);
    assert_eq!(json["data"]["total_mined"], 8);

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.token_balance, 8);
    assert!((user.usdt_balance - 0.0008).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Complete
// ---------------------------------------------------------------------------

/// Scenario: 4-hour session at 1.0 tokens/hour with power 2, completed a
/// minute late, pays exactly floor(4 * 1.0 * 2) = 8.
#[sqlx::test(migrations = "../db/migrations")]
async fn complete_full_session_pays_scheduled_reward(pool: PgPool) {
    let user = seed_user(&pool, 30, 1.0, 2).await;
    let session = seed_expired_session(&pool, &user, 4, 1).await;

    let app = build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/mining/sessions/{}/complete", session.id),
        30,
        serde_json::json!({}),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;

    let data = &json["data"];
    assert_eq!(data["status"], "completed");
    assert_eq!(data["reward"], 8);
    assert_eq!(data["token_balance"], 8);
    assert_eq!(data["session"]["is_active"], false);
    assert_eq!(data["session"]["total_mined"], 8);

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.token_balance, 8);
}

/// Completing before the scheduled end pays the floored partial accrual.
#[sqlx::test(migrations = "../db/migrations")]
async fn complete_mid_session_pays_partial_reward(pool: PgPool) {
    let user = seed_user(&pool, 31, 10.0, 1).await;
    let start = Utc::now() - Duration::minutes(90);
    let session = MiningSessionRepo::create(
        &pool,
        &CreateMiningSession {
            user_id: user.id,
            start_time: start,
            end_time: start + Duration::hours(4),
            tokens_per_hour: user.tokens_per_hour,
            mining_power: user.mining_power,
        },
    )
    .await
    .unwrap();

    let app = build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/mining/sessions/{}/complete", session.id),
        31,
        serde_json::json!({}),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;

    // floor(1.5h * 10.0 * 1) = 15.
    assert_eq!(json["data"]["reward"], 15);
}

/// The duplicate call reports already-completed and credits nothing.
#[sqlx::test(migrations = "../db/migrations")]
async fn complete_twice_credits_once(pool: PgPool) {
    let user = seed_user(&pool, 32, 1.0, 2).await;
    let session = seed_expired_session(&pool, &user, 4, 1).await;
    let uri = format!("/api/v1/mining/sessions/{}/complete", session.id);

    let app = build_test_app(pool.clone());

    let first = post_json(app.clone(), &uri, 32, serde_json::json!({})).await;
    let first_json = expect_json(first, StatusCode::OK).await;
    assert_eq!(first_json["data"]["status"], "completed");

    let second = post_json(app, &uri, 32, serde_json::json!({})).await;
    let second_json = expect_json(second, StatusCode::OK).await;
    assert_eq!(second_json["data"]["status"], "already_completed");

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.token_balance, 8, "total credit across both calls is 8, not 16");
}

/// Two racing settlements: exactly one wins the CAS and credits; the other
/// observes zero rows affected.
#[sqlx::test(migrations = "../db/migrations")]
async fn concurrent_settlement_credits_once(pool: PgPool) {
    let user = seed_user(&pool, 33, 1.0, 2).await;
    let session = seed_expired_session(&pool, &user, 4, 1).await;

    let state = build_test_state(pool.clone(), FakeChain::new(), test_config());
    let now = Utc::now();

    let (a, b) = tokio::join!(
        mining::settle(&state, &session, now),
        mining::settle(&state, &session, now),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert!(
        a.is_some() ^ b.is_some(),
        "exactly one concurrent settlement must win"
    );

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.token_balance, 8);

    let settled = MiningSessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!settled.is_active);
    assert_eq!(settled.total_mined, Some(8));
}

/// Completing another user's session is a fatal authorization error.
#[sqlx::test(migrations = "../db/migrations")]
async fn complete_foreign_session_is_forbidden(pool: PgPool) {
    let owner = seed_user(&pool, 34, 1.0, 2).await;
    let session = seed_expired_session(&pool, &owner, 4, 1).await;

    let app = build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/mining/sessions/{}/complete", session.id),
        35, // a different Telegram user
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let owner = UserRepo::find_by_id(&pool, owner.id).await.unwrap().unwrap();
    assert_eq!(owner.token_balance, 0);
}

/// Unknown session ids are a 404.
#[sqlx::test(migrations = "../db/migrations")]
async fn complete_unknown_session_is_not_found(pool: PgPool) {
    let app = build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/mining/sessions/999999/complete",
        36,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// The per-session cooldown throttles settlement storms against a session
/// that is still active.
#[sqlx::test(migrations = "../db/migrations")]
async fn complete_cooldown_throttles_storms(pool: PgPool) {
    let user = seed_user(&pool, 37, 1.0, 2).await;
    let start = Utc::now() - Duration::minutes(30);
    let session = MiningSessionRepo::create(
        &pool,
        &CreateMiningSession {
            user_id: user.id,
            start_time: start,
            end_time: start + Duration::hours(4),
            tokens_per_hour: user.tokens_per_hour,
            mining_power: user.mining_power,
        },
    )
    .await
    .unwrap();

    let mut config = test_config();
    config.mining_complete_cooldown_secs = 5;
    let state = build_test_state(pool, FakeChain::new(), config);

    // Burn the cooldown slot, as a just-failed attempt would.
    assert!(state.limits.complete_cooldown.try_acquire(
        session.id,
        std::time::Instant::now(),
        std::time::Duration::from_secs(5),
    ));

    let err = mining::complete_session(&state, session.id, &user, Utc::now())
        .await
        .expect_err("second attempt inside the cooldown must be throttled");
    assert_matches!(err, AppError::Core(CoreError::RateLimited(_)));
}

/// The background sweeper settles overdue sessions through the same path
/// as explicit completion.
#[sqlx::test(migrations = "../db/migrations")]
async fn sweeper_settles_overdue_sessions(pool: PgPool) {
    let user = seed_user(&pool, 39, 1.0, 2).await;
    let session = seed_expired_session(&pool, &user, 4, 1).await;

    let state = build_test_state(pool.clone(), FakeChain::new(), test_config());
    tonmine_api::background::session_sweeper::sweep_once(&state)
        .await
        .unwrap();

    let settled = MiningSessionRepo::find_by_id(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!settled.is_active);
    assert_eq!(settled.total_mined, Some(8));

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.token_balance, 8);
}

/// A throttled duplicate of an already-settled session still reports
/// already-completed rather than an error.
#[sqlx::test(migrations = "../db/migrations")]
async fn cooldown_loser_sees_already_completed(pool: PgPool) {
    let user = seed_user(&pool, 38, 1.0, 2).await;
    let session = seed_expired_session(&pool, &user, 4, 1).await;

    let mut config = test_config();
    config.mining_complete_cooldown_secs = 5;
    let state = build_test_state(pool, FakeChain::new(), config);

    let first = mining::complete_session(&state, session.id, &user, Utc::now())
        .await
        .unwrap();
    assert_matches!(first, CompleteOutcome::Completed { reward: 8, .. });

    // Inside the cooldown window, but the session is settled: the
    // short-circuit answers before the throttle.
    let second = mining::complete_session(&state, session.id, &user, Utc::now())
        .await
        .unwrap();
    assert_matches!(second, CompleteOutcome::AlreadyCompleted { .. });
}
