//! Shared helpers for HTTP-level integration tests.
//!
//! Builds the real application router (same middleware stack as production)
//! against a test pool, with a fake chain indexer and a disabled notifier.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use tonmine_api::config::ServerConfig;
use tonmine_api::middleware::auth::INIT_DATA_HEADER;
use tonmine_api::router::build_app_router;
use tonmine_api::state::{AppState, RateLimits};
use tonmine_chain::{ChainError, ChainTransaction, TransactionSource};
use tonmine_core::init_data;
use tonmine_telegram::Notifier;

/// Bot token used by every test; initData headers are signed with it.
pub const TEST_BOT_TOKEN: &str = "1234567:test-token";

// ---------------------------------------------------------------------------
// Fake chain indexer
// ---------------------------------------------------------------------------

/// In-memory [`TransactionSource`]: tests push the transactions the
/// "chain" should report.
#[derive(Default)]
pub struct FakeChain {
    transactions: Mutex<Vec<ChainTransaction>>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, hash: &str, destination: &str, value_nano: i64, utime: i64) {
        self.transactions
            .lock()
            .unwrap()
            .push(ChainTransaction {
                hash: hash.to_string(),
                value_nano,
                utime,
                source: None,
                destination: destination.to_string(),
            });
    }
}

#[async_trait]
impl TransactionSource for FakeChain {
    async fn recent_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<ChainTransaction>, ChainError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| tx.destination == address)
            .cloned()
            .collect())
    }
}

/// A [`TransactionSource`] that is always down, for the degrade-to-pending
/// path.
pub struct FailingChain;

#[async_trait]
impl TransactionSource for FailingChain {
    async fn recent_transactions(
        &self,
        _address: &str,
    ) -> Result<Vec<ChainTransaction>, ChainError> {
        Err(ChainError::HttpStatus(503))
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
///
/// The completion cooldown is zeroed so sequential completion tests are
/// deterministic; dedicated tests re-enable it.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        telegram_bot_token: TEST_BOT_TOKEN.to_string(),
        init_data_max_age_secs: 86_400,
        ton_index_url: "http://127.0.0.1:0".to_string(),
        ton_index_api_key: None,
        ton_index_timeout_secs: 10,
        payment_window_secs: 600,
        payment_tolerance_nano: 10_000_000,
        payment_verify_max_attempts: 1_000,
        payment_verify_window_secs: 60,
        mining_complete_cooldown_secs: 0,
        session_sweep_interval_secs: 60,
        usdt_per_token: 0.0001,
        usdt_per_ton: 5.0,
    }
}

/// Build an [`AppState`] around the given pool, chain source, and config.
pub fn build_test_state(
    pool: PgPool,
    chain: Arc<dyn TransactionSource>,
    config: ServerConfig,
) -> AppState {
    AppState {
        pool,
        config: Arc::new(config),
        chain,
        notifier: Notifier::disabled(),
        limits: Arc::new(RateLimits::default()),
    }
}

/// Build the full application router from a state.
pub fn app_from_state(state: AppState) -> Router {
    let config = state.config.as_ref().clone();
    build_app_router(state, &config)
}

/// Router with an empty fake chain; enough for mining-only tests.
pub fn build_test_app(pool: PgPool) -> Router {
    app_from_state(build_test_state(pool, FakeChain::new(), test_config()))
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Produce a validly-signed initData string for `telegram_id`, the way
/// Telegram would hand it to the Mini App.
pub fn signed_init_data(telegram_id: i64) -> String {
    let user_json = format!(r#"{{"id":{telegram_id},"first_name":"Test","username":"tester"}}"#);
    let auth_date = Utc::now().timestamp();

    let data_check_string = format!("auth_date={auth_date}\nquery_id=AAE1\nuser={user_json}");
    let hash = init_data::compute_hash(TEST_BOT_TOKEN, &data_check_string);

    let mut encoded = form_urlencoded::Serializer::new(String::new());
    encoded.append_pair("query_id", "AAE1");
    encoded.append_pair("user", &user_json);
    encoded.append_pair("auth_date", &auth_date.to_string());
    encoded.append_pair("hash", &hash);
    encoded.finish()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send an authenticated GET request.
pub async fn get(app: Router, uri: &str, telegram_id: i64) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header(INIT_DATA_HEADER, signed_init_data(telegram_id))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send an authenticated POST request with a JSON body.
pub async fn post_json(
    app: Router,
    uri: &str,
    telegram_id: i64,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(INIT_DATA_HEADER, signed_init_data(telegram_id))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send an unauthenticated POST request (no initData header).
pub async fn post_unauthenticated(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert a status and return the parsed body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
