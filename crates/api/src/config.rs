/// Server configuration loaded from environment variables.
///
/// All fields except the bot token have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,

    /// Telegram bot token; signs the Mini App initData we validate.
    pub telegram_bot_token: String,
    /// Maximum accepted age of a signed initData payload, in seconds.
    pub init_data_max_age_secs: i64,

    /// Base URL of the TON transaction indexer.
    pub ton_index_url: String,
    /// Optional API key for the indexer.
    pub ton_index_api_key: Option<String>,
    /// Per-request timeout against the indexer, in seconds.
    pub ton_index_timeout_secs: u64,

    /// How long after payment creation a chain transaction may land.
    pub payment_window_secs: i64,
    /// Maximum absolute deviation from the expected amount, in nanotons.
    pub payment_tolerance_nano: i64,
    /// Verification attempts allowed per user per window.
    pub payment_verify_max_attempts: usize,
    /// Length of the verification-attempt window, in seconds.
    pub payment_verify_window_secs: u64,

    /// Minimum interval between settlement attempts per session, in seconds.
    pub mining_complete_cooldown_secs: u64,
    /// Interval of the overdue-session sweeper, in seconds.
    pub session_sweep_interval_secs: u64,

    /// Secondary-currency credit per mined token.
    pub usdt_per_token: f64,
    /// Secondary-currency credit per deposited TON.
    pub usdt_per_ton: f64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `HOST`                          | `0.0.0.0`               |
    /// | `PORT`                          | `3000`                  |
    /// | `CORS_ORIGINS`                  | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`          | `30`                    |
    /// | `TELEGRAM_BOT_TOKEN`            | (required)              |
    /// | `INIT_DATA_MAX_AGE_SECS`        | `86400`                 |
    /// | `TON_INDEX_URL`                 | `https://toncenter.com` |
    /// | `TON_INDEX_API_KEY`             | (unset)                 |
    /// | `TON_INDEX_TIMEOUT_SECS`        | `10`                    |
    /// | `PAYMENT_WINDOW_SECS`           | `600`                   |
    /// | `PAYMENT_AMOUNT_TOLERANCE_NANO` | `10000000`              |
    /// | `PAYMENT_VERIFY_MAX_ATTEMPTS`   | `10`                    |
    /// | `PAYMENT_VERIFY_WINDOW_SECS`    | `60`                    |
    /// | `MINING_COMPLETE_COOLDOWN_SECS` | `5`                     |
    /// | `SESSION_SWEEP_INTERVAL_SECS`   | `60`                    |
    /// | `USDT_PER_TOKEN`                | `0.0001`                |
    /// | `USDT_PER_TON`                  | `5.0`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_parsed("PORT", "3000");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let telegram_bot_token =
            std::env::var("TELEGRAM_BOT_TOKEN").expect("TELEGRAM_BOT_TOKEN must be set");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_parsed("REQUEST_TIMEOUT_SECS", "30"),
            telegram_bot_token,
            init_data_max_age_secs: env_parsed("INIT_DATA_MAX_AGE_SECS", "86400"),
            ton_index_url: std::env::var("TON_INDEX_URL")
                .unwrap_or_else(|_| "https://toncenter.com".into()),
            ton_index_api_key: std::env::var("TON_INDEX_API_KEY").ok(),
            ton_index_timeout_secs: env_parsed("TON_INDEX_TIMEOUT_SECS", "10"),
            payment_window_secs: env_parsed("PAYMENT_WINDOW_SECS", "600"),
            payment_tolerance_nano: env_parsed("PAYMENT_AMOUNT_TOLERANCE_NANO", "10000000"),
            payment_verify_max_attempts: env_parsed("PAYMENT_VERIFY_MAX_ATTEMPTS", "10"),
            payment_verify_window_secs: env_parsed("PAYMENT_VERIFY_WINDOW_SECS", "60"),
            mining_complete_cooldown_secs: env_parsed("MINING_COMPLETE_COOLDOWN_SECS", "5"),
            session_sweep_interval_secs: env_parsed("SESSION_SWEEP_INTERVAL_SECS", "60"),
            usdt_per_token: env_parsed("USDT_PER_TOKEN", "0.0001"),
            usdt_per_ton: env_parsed("USDT_PER_TON", "5.0"),
        }
    }
}

/// Read an env var with a default and parse it, panicking on garbage --
/// misconfiguration should fail fast at startup.
fn env_parsed<T: std::str::FromStr>(name: &str, default: &str) -> T {
    let raw = std::env::var(name).unwrap_or_else(|_| default.into());
    raw.parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid value, got '{raw}'"))
}
