//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay policy between guest fetch attempts.
///
/// A zero base disables backoff entirely: attempts run back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    pub fn is_disabled(&self) -> bool {
        self.base_ms == 0
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.is_disabled() {
            return Duration::ZERO;
        }
        calculate_backoff(attempt, self.base_ms, self.max_ms)
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000 && max.as_millis() < 1100);
    }

    #[test]
    fn test_disabled_backoff() {
        let backoff = Backoff::from_millis(0, 2000);
        assert!(backoff.is_disabled());
        assert_eq!(backoff.delay(1), Duration::ZERO);
        assert_eq!(backoff.delay(15), Duration::ZERO);
        assert_eq!(Backoff::default().delay(3), Duration::ZERO);
    }

    #[test]
    fn test_enabled_backoff_grows() {
        let backoff = Backoff::from_millis(50, 400);
        assert!(backoff.delay(1) >= Duration::from_millis(50));
        assert!(backoff.delay(3) >= Duration::from_millis(200));
        assert!(backoff.delay(30) < Duration::from_millis(440));
    }
}
