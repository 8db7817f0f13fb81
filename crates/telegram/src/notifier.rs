//! Fire-and-forget delivery of chat messages via the Telegram Bot API.

use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tonmine_db::repositories::UserRepo;

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Bot API status for "bot was blocked by the user" (and kicked/deactivated
/// chats). A permanent failure: flag the user so the scheduling subsystem
/// stops retrying.
const STATUS_BLOCKED: u16 = 403;

/// A message queued for delivery to a user's chat.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Telegram chat id (equal to the user's Telegram id for private chats).
    pub chat_id: i64,
    pub text: String,
}

/// Error type for a single delivery attempt.
#[derive(Debug, thiserror::Error)]
enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Bot API returned HTTP {0}")]
    HttpStatus(u16),
}

/// Cheaply-cloneable handle for enqueueing notifications.
///
/// Dropping every handle closes the channel and stops the delivery task.
#[derive(Clone)]
pub struct Notifier {
    sender: Option<mpsc::UnboundedSender<Notification>>,
}

impl Notifier {
    /// Spawn the delivery task and return the enqueue handle.
    pub fn spawn(bot_token: String, pool: PgPool) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(delivery_loop(bot_token, pool, receiver));
        (
            Self {
                sender: Some(sender),
            },
            handle,
        )
    }

    /// A notifier that drops every message. Used by tests and by
    /// deployments without a bot token.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Enqueue a message. Never blocks, never fails the caller.
    pub fn notify(&self, chat_id: i64, text: impl Into<String>) {
        let Some(sender) = &self.sender else {
            return;
        };
        let notification = Notification {
            chat_id,
            text: text.into(),
        };
        if sender.send(notification).is_err() {
            tracing::warn!(chat_id, "Notifier channel closed, dropping message");
        }
    }
}

/// Drain the queue until every [`Notifier`] handle is dropped.
async fn delivery_loop(
    bot_token: String,
    pool: PgPool,
    mut receiver: mpsc::UnboundedReceiver<Notification>,
) {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build reqwest HTTP client");

    tracing::info!("Telegram notifier started");

    while let Some(notification) = receiver.recv().await {
        match try_send(&client, &bot_token, &notification).await {
            Ok(()) => {
                tracing::debug!(chat_id = notification.chat_id, "Notification delivered");
            }
            Err(DeliveryError::HttpStatus(STATUS_BLOCKED)) => {
                tracing::info!(
                    chat_id = notification.chat_id,
                    "Chat rejects bot messages, flagging user"
                );
                if let Err(e) =
                    UserRepo::set_notifications_blocked(&pool, notification.chat_id).await
                {
                    tracing::warn!(chat_id = notification.chat_id, error = %e,
                        "Failed to flag blocked user");
                }
            }
            Err(e) => {
                // Best-effort: log and move on, never retry into settlement.
                tracing::warn!(chat_id = notification.chat_id, error = %e,
                    "Notification delivery failed");
            }
        }
    }

    tracing::info!("Telegram notifier stopped");
}

/// Execute a single `sendMessage` call and check the response status.
async fn try_send(
    client: &reqwest::Client,
    bot_token: &str,
    notification: &Notification,
) -> Result<(), DeliveryError> {
    let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
    let payload = serde_json::json!({
        "chat_id": notification.chat_id,
        "text": notification.text,
    });

    let response = client.post(&url).json(&payload).send().await?;
    if !response.status().is_success() {
        return Err(DeliveryError::HttpStatus(response.status().as_u16()));
    }
    Ok(())
}
