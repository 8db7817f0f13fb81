use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Too many attempts inside the throttle window. Best-effort signal,
    /// never a correctness mechanism.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// A computed value violated a hard invariant (accrual sanity bound,
    /// duplicate transaction hash). Must abort the operation, never clamp.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
