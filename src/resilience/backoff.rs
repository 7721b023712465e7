//! Exponential backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

/// Delay before the `attempt`-th retry: `initial * 2^(attempt - 1)`.
///
/// Attempt 0 means "no retry yet" and yields zero. Saturates instead of
/// overflowing for large attempt counts.
pub fn calculate_backoff(attempt: u32, initial: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let initial_ms = u64::try_from(initial.as_millis()).unwrap_or(u64::MAX);
    let exponential_base = 2u64.saturating_pow(attempt - 1);
    Duration::from_millis(initial_ms.saturating_mul(exponential_base))
}

/// Add up to `percent`% of random extra delay. Zero leaves the delay exact.
pub fn apply_jitter(delay: Duration, percent: u8) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    let jitter_range = delay_ms.saturating_mul(u64::from(percent.min(100))) / 100;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let initial = Duration::from_millis(100);
        assert_eq!(calculate_backoff(0, initial), Duration::ZERO);
        assert_eq!(calculate_backoff(1, initial), Duration::from_millis(100));
        assert_eq!(calculate_backoff(2, initial), Duration::from_millis(200));
        assert_eq!(calculate_backoff(3, initial), Duration::from_millis(400));
        assert_eq!(calculate_backoff(10, initial), Duration::from_millis(51_200));
    }

    #[test]
    fn test_backoff_saturates() {
        let d = calculate_backoff(200, Duration::from_millis(100));
        assert_eq!(d, Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_millis(1000);
        assert_eq!(apply_jitter(base, 0), base);

        for _ in 0..50 {
            let d = apply_jitter(base, 10);
            assert!(d >= base);
            assert!(d < Duration::from_millis(1100));
        }
    }
}
