//! Payment record model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use tonmine_core::types::{DbId, Timestamp};

use crate::models::status::{PaymentStatus, StatusId};

/// A payment row from the `payments` table.
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: DbId,
    pub user_id: DbId,
    pub destination_address: String,
    pub amount_nano: i64,
    pub status_id: StatusId,
    pub tx_hash: Option<String>,
    pub created_at: Timestamp,
    pub confirmed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Resolved status enum; unknown ids surface as `None` rather than
    /// panicking so a bad row cannot take a handler down.
    pub fn status(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_id(self.status_id)
    }
}

/// External-facing payment representation with the status name resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: DbId,
    pub destination_address: String,
    pub amount_nano: i64,
    pub status: &'static str,
    pub tx_hash: Option<String>,
    pub created_at: Timestamp,
    pub confirmed_at: Option<Timestamp>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        let status = p.status().map(PaymentStatus::name).unwrap_or("unknown");
        Self {
            id: p.id,
            destination_address: p.destination_address,
            amount_nano: p.amount_nano,
            status,
            tx_hash: p.tx_hash,
            created_at: p.created_at,
            confirmed_at: p.confirmed_at,
        }
    }
}

/// DTO for creating a new payment intent.
pub struct CreatePayment {
    pub user_id: DbId,
    pub destination_address: String,
    pub amount_nano: i64,
}
