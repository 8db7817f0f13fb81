//! Telegram initData authentication extractor for Axum handlers.
//!
//! Every mutating endpoint derives the acting identity from the signed
//! initData payload in the `X-Telegram-Init-Data` header. A bare numeric
//! user id in a request body is never accepted as authorization.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use tonmine_core::error::CoreError;
use tonmine_core::init_data;
use tonmine_db::models::user::User;
use tonmine_db::repositories::UserRepo;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the raw Mini App initData query string.
pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";

/// Authenticated user extracted from validated Telegram initData.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(auth: TelegramAuth) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user.id, "handling request");
///     Ok(Json(()))
/// }
/// ```
///
/// The user row is upserted on every authenticated request, so handlers
/// always see current settings (rate, power, duration) and first contact
/// auto-registers the account.
#[derive(Debug, Clone)]
pub struct TelegramAuth {
    pub user: User,
}

impl FromRequestParts<AppState> for TelegramAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(INIT_DATA_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing X-Telegram-Init-Data header".into(),
                ))
            })?;

        let validated = init_data::validate(
            raw,
            &state.config.telegram_bot_token,
            state.config.init_data_max_age_secs,
            Utc::now(),
        )?;

        let user = UserRepo::upsert_telegram(
            &state.pool,
            validated.user.id,
            validated.user.username.as_deref(),
        )
        .await?;

        Ok(TelegramAuth { user })
    }
}
