//! Outbound Telegram messaging for the tonmine backend.
//!
//! Settlement code hands messages to [`Notifier`] over a channel and moves
//! on; a single delivery task owns the HTTP client. Delivery is best-effort
//! by contract — no failure here may affect a reward or payment state.

pub mod notifier;

pub use notifier::{Notification, Notifier};
