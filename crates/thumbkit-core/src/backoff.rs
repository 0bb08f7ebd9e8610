//! Exponential backoff for the poll loop.

use std::time::Duration;

/// Delay before retrying after `attempt` consecutive transport errors
/// (0-based).
///
/// Uses `base_delay * 2^attempt`, capped at `max_delay_ms`.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(max_delay_ms))
}
