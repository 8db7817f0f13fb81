//! Telegram WebApp `initData` validation.
//!
//! Every authenticated request carries the raw `initData` query string the
//! Mini App received from Telegram. Its `hash` field is an HMAC-SHA256 over
//! the remaining fields, keyed by a secret derived from the bot token, so
//! the backend can verify the identity offline. A bare client-supplied user
//! id is never accepted as authorization.
//!
//! Scheme (per Telegram's Mini App documentation):
//! 1. percent-decode the query pairs and drop the `hash` pair,
//! 2. sort the remaining pairs by key and join as `key=value` lines,
//! 3. `secret = HMAC_SHA256(key = "WebAppData", msg = bot_token)`,
//! 4. `expected = hex(HMAC_SHA256(key = secret, msg = data_check_string))`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::CoreError;
use crate::types::Timestamp;

type HmacSha256 = Hmac<Sha256>;

/// Key used to derive the per-bot secret from the bot token.
const WEBAPP_DATA_KEY: &[u8] = b"WebAppData";

/// The Telegram user embedded in validated initData.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// The outcome of a successful initData validation.
#[derive(Debug, Clone)]
pub struct ValidatedInitData {
    pub user: TelegramUser,
    pub auth_date: Timestamp,
}

/// Validate a raw initData string against the bot token.
///
/// `now` comes from the server clock; `max_age_secs` bounds how old the
/// signed `auth_date` may be before the payload is rejected as stale.
pub fn validate(
    init_data: &str,
    bot_token: &str,
    max_age_secs: i64,
    now: Timestamp,
) -> Result<ValidatedInitData, CoreError> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut provided_hash: Option<String> = None;

    for (key, value) in form_urlencoded::parse(init_data.as_bytes()) {
        if key == "hash" {
            provided_hash = Some(value.into_owned());
        } else {
            pairs.push((key.into_owned(), value.into_owned()));
        }
    }

    let provided_hash = provided_hash
        .ok_or_else(|| CoreError::Unauthorized("initData is missing the hash field".into()))?;

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let data_check_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let expected = compute_hash(bot_token, &data_check_string);
    if expected != provided_hash {
        return Err(CoreError::Unauthorized("initData signature mismatch".into()));
    }

    let auth_date_secs: i64 = pairs
        .iter()
        .find(|(k, _)| k == "auth_date")
        .and_then(|(_, v)| v.parse().ok())
        .ok_or_else(|| CoreError::Unauthorized("initData is missing a valid auth_date".into()))?;

    let age_secs = now.timestamp() - auth_date_secs;
    if age_secs > max_age_secs {
        return Err(CoreError::Unauthorized("initData is stale".into()));
    }

    let auth_date = chrono::DateTime::from_timestamp(auth_date_secs, 0)
        .ok_or_else(|| CoreError::Unauthorized("initData auth_date out of range".into()))?;

    let user_json = pairs
        .iter()
        .find(|(k, _)| k == "user")
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| CoreError::Unauthorized("initData is missing the user field".into()))?;

    let user: TelegramUser = serde_json::from_str(user_json)
        .map_err(|e| CoreError::Unauthorized(format!("initData user payload invalid: {e}")))?;

    Ok(ValidatedInitData { user, auth_date })
}

/// HMAC chain over the data-check string, hex-encoded lowercase.
pub fn compute_hash(bot_token: &str, data_check_string: &str) -> String {
    let mut secret = HmacSha256::new_from_slice(WEBAPP_DATA_KEY).expect("HMAC accepts any key size");
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).expect("HMAC accepts any key size");
    mac.update(data_check_string.as_bytes());
    let digest = mac.finalize().into_bytes();

    digest.iter().map(|b| format!("{b:02x}")).collect()
}
