use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tonmine_api::config::ServerConfig;
use tonmine_api::router::build_app_router;
use tonmine_api::state::{AppState, RateLimits};
use tonmine_api::background;
use tonmine_chain::TonIndexClient;
use tonmine_telegram::Notifier;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonmine_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = tonmine_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    tonmine_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    tonmine_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Chain indexer client ---
    let chain = Arc::new(TonIndexClient::new(
        config.ton_index_url.clone(),
        config.ton_index_api_key.clone(),
        Duration::from_secs(config.ton_index_timeout_secs),
    ));
    tracing::info!(url = %config.ton_index_url, "Chain indexer client ready");

    // --- Telegram notifier ---
    let (notifier, notifier_handle) =
        Notifier::spawn(config.telegram_bot_token.clone(), pool.clone());
    tracing::info!("Telegram notifier started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        chain,
        notifier,
        limits: Arc::new(RateLimits::default()),
    };

    // --- Session sweeper ---
    let sweeper_cancel = CancellationToken::new();
    let sweeper_handle = tokio::spawn(background::session_sweeper::run(
        state.clone(),
        sweeper_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop the sweeper; in-flight settlements finish on their own.
    sweeper_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper_handle).await;
    tracing::info!("Session sweeper stopped");

    // The router (and its AppState) is dropped by now, which closes the
    // notifier channel and lets the delivery task drain and exit.
    let _ = tokio::time::timeout(Duration::from_secs(5), notifier_handle).await;
    tracing::info!("Telegram notifier stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
