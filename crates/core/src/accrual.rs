//! Mining-session accrual math.
//!
//! Pure functions only; the caller supplies every timestamp from the server
//! clock. Token amounts are floored to whole tokens, never rounded, so
//! fractional drift cannot accumulate in the user's favor across sessions.

use crate::error::CoreError;
use crate::types::Timestamp;

/// Seconds per hour (3600.0).
pub const SECS_PER_HOUR: f64 = 3600.0;

/// Compute the reward for a mining session.
///
/// `effective_end = min(now, scheduled_end)` — accrual never exceeds the
/// originally scheduled session length, no matter how late the completion
/// call arrives. Elapsed time before `start` counts as zero.
///
/// Returns [`CoreError::Integrity`] if the computed reward exceeds the
/// maximum possible for the scheduled duration. That can only happen on a
/// clock or logic fault and must abort the settlement instead of paying out.
pub fn compute(
    start: Timestamp,
    scheduled_end: Timestamp,
    now: Timestamp,
    rate_per_hour: f64,
    power: i32,
) -> Result<i64, CoreError> {
    let tokens = tokens_for(start, scheduled_end.min(now), rate_per_hour, power);
    let max_possible = tokens_for(start, scheduled_end, rate_per_hour, power);

    if tokens > max_possible {
        return Err(CoreError::Integrity(format!(
            "accrued {tokens} tokens exceeds session maximum {max_possible}"
        )));
    }

    Ok(tokens)
}

/// Floored token count for the span `start..end` at the given rate and power.
fn tokens_for(start: Timestamp, end: Timestamp, rate_per_hour: f64, power: i32) -> i64 {
    let elapsed_secs = (end - start).num_seconds().max(0);
    let elapsed_hours = elapsed_secs as f64 / SECS_PER_HOUR;
    (elapsed_hours * rate_per_hour * f64::from(power)).floor() as i64
}
