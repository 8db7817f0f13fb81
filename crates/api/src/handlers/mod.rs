//! HTTP handlers. Thin by design: authenticate, validate input, delegate
//! to the engine, wrap the result in the response envelope.

pub mod mining;
pub mod payments;
