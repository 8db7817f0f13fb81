//! TON chain-indexer client.
//!
//! The payment verifier needs one read-only question answered: "which
//! transactions recently arrived at address X, with what value and when?"
//! [`TransactionSource`] is that seam; [`TonIndexClient`] implements it
//! against a toncenter-style HTTP API. The indexer is eventually consistent
//! and occasionally unavailable — callers treat request failures as
//! "no match yet", never as fatal.

pub mod client;

pub use client::{ChainError, ChainTransaction, TonIndexClient, TransactionSource};
