//! Wall-clock sources for fields derived at call time.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

use crate::Timestamp;

/// Supplies the current time to a façade.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> Timestamp;
}

/// A wall clock that never goes backwards.
///
/// Each reading is at least as late as every reading returned before it, even
/// if the system clock is stepped back between calls. Readings have
/// microsecond resolution.
#[derive(Debug)]
pub struct MonotonicClock {
    last_micros: AtomicI64,
}

impl MonotonicClock {
    /// Creates a clock with no readings yet.
    pub fn new() -> Self {
        Self {
            last_micros: AtomicI64::new(i64::MIN),
        }
    }

    fn observe(&self, wall_micros: i64) -> i64 {
        let previous = self.last_micros.fetch_max(wall_micros, Ordering::AcqRel);
        previous.max(wall_micros)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let micros = self.observe(Utc::now().timestamp_micros());
        DateTime::<Utc>::from_timestamp_micros(micros)
            .map(Timestamp::from_utc)
            .unwrap_or_else(Timestamp::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_ignores_backwards_steps() {
        let clock = MonotonicClock::new();
        assert_eq!(clock.observe(1_000), 1_000);
        assert_eq!(clock.observe(900), 1_000);
        assert_eq!(clock.observe(1_500), 1_500);
    }

    #[test]
    fn test_monotonic_clock_readings_are_non_decreasing() {
        let clock = MonotonicClock::new();
        let mut last = clock.now();
        for _ in 0..1_000 {
            let next = clock.now();
            assert!(next >= last);
            last = next;
        }
    }
}
