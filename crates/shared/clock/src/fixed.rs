use std::sync::RwLock;

use chrono::Duration;
use vega_core::Timestamp;
use vega_ports::Clock;

/// Frozen clock for deterministic tests
///
/// Time only moves when `advance` or `set` is called, so tests can walk
/// through expiry days, cool-down windows, and staleness thresholds one
/// step at a time.
pub struct FixedClock {
    current: RwLock<Timestamp>,
}

impl FixedClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    /// Move the clock forward by the given duration
    pub fn advance(&self, by: Duration) {
        if let Ok(mut t) = self.current.write() {
            *t = *t + by;
        }
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: Timestamp) {
        if let Ok(mut t) = self.current.write() {
            *t = to;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        match self.current.read() {
            Ok(t) => *t,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn name(&self) -> &str {
        "FixedClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_fixed_clock_only_moves_explicitly() {
        let start = Utc.with_ymd_and_hms(2025, 9, 25, 10, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::days(1));
        assert_eq!(clock.now(), start + Duration::days(1));

        let jump = Utc.with_ymd_and_hms(2025, 10, 30, 15, 0, 0).unwrap();
        clock.set(jump);
        assert_eq!(clock.now(), jump);
    }
}
