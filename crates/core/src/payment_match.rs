//! Candidate selection for on-chain payment confirmation.
//!
//! The verifier queries an indexer for recent transactions to the payment's
//! destination address and accepts a candidate only if its value is within a
//! small absolute tolerance of the expected amount AND its timestamp falls
//! inside a bounded window after the payment record was created. Matching is
//! pure so the window and tolerance edges are unit-testable.

use crate::types::Timestamp;

/// A transaction observed on chain, normalized by the indexer client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTx {
    /// Chain transaction hash (base64 or hex, as reported by the indexer).
    pub hash: String,
    /// Transferred value in nanotons.
    pub value_nano: i64,
    /// Unix timestamp of the transaction.
    pub utime: i64,
}

/// Find the first candidate whose value and timestamp match the payment.
///
/// * `expected_nano` — the payment's expected amount in nanotons.
/// * `tolerance_nano` — maximum absolute deviation from `expected_nano`.
/// * `created_at` — when the payment record was created.
/// * `window_secs` — how long after `created_at` a transaction may land.
///
/// A transaction timed before `created_at` never matches: it cannot have
/// been sent for this payment. `None` means "not confirmed yet", which the
/// caller reports as a pending (recoverable) state, not a failure.
pub fn find_match<'a>(
    candidates: &'a [CandidateTx],
    expected_nano: i64,
    tolerance_nano: i64,
    created_at: Timestamp,
    window_secs: i64,
) -> Option<&'a CandidateTx> {
    let window_start = created_at.timestamp();
    let window_end = window_start + window_secs;

    candidates.iter().find(|tx| {
        !tx.hash.is_empty()
            && (tx.value_nano - expected_nano).abs() <= tolerance_nano
            && tx.utime >= window_start
            && tx.utime <= window_end
    })
}
