//! Settlement and verification engines.
//!
//! [`mining`] owns the session lifecycle (start, poll, settle); [`payments`]
//! owns on-chain verification and the replay guard. Handlers stay thin and
//! the background sweeper reuses the same settlement path, so reward logic
//! exists exactly once.

pub mod mining;
pub mod payments;
