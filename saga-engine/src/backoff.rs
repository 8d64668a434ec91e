//! Retry backoff
//!
//! Exponential with factor 2, capped, full jitter: the delay is drawn
//! uniformly from [0, min(cap, base * 2^(attempt-1))].

use chrono::Duration;
use rand::Rng;

/// Compute the delay before retry number `attempt` (1-based)
pub fn full_jitter(base_ms: u64, cap_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << (attempt.saturating_sub(1)).min(16));
    let ceiling = exp.min(cap_ms).max(1);
    let millis = rand::thread_rng().gen_range(0..=ceiling);
    Duration::milliseconds(millis as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_bounded_by_cap() {
        for attempt in 1..=10 {
            let delay = full_jitter(100, 3_000, attempt);
            assert!(delay >= Duration::zero());
            assert!(delay <= Duration::milliseconds(3_000));
        }
    }

    #[test]
    fn test_ceiling_grows_exponentially_until_cap() {
        // With a huge cap, attempt 4 can reach base * 8
        let mut max_seen = Duration::zero();
        for _ in 0..200 {
            max_seen = max_seen.max(full_jitter(100, u64::MAX / 2, 4));
        }
        assert!(max_seen > Duration::milliseconds(400));
        assert!(max_seen <= Duration::milliseconds(800));
    }
}
