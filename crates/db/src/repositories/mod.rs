//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! an executor as the first argument: `&PgPool` for standalone queries, any
//! `PgExecutor` (e.g. a transaction connection) for the conditional updates
//! that must commit together with a ledger credit.

pub mod mining_session_repo;
pub mod payment_repo;
pub mod user_repo;

pub use mining_session_repo::MiningSessionRepo;
pub use payment_repo::PaymentRepo;
pub use user_repo::UserRepo;
