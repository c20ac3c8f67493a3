//! Injectable time source.
//!
//! Every timestamped value the core produces depends on "now" being supplied
//! or obtainable. Production callers use [`SystemClock`]; tests inject
//! [`FixedClock`] or [`SteppedClock`] so output is deterministic.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Advances by a fixed step on every `now()` call.
///
/// The first call returns the start instant, the second returns
/// `start + step`, and so on.
#[derive(Debug)]
pub struct SteppedClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppedClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Clock for SteppedClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().expect("clock lock poisoned");
        let current = *next;
        *next = current + self.step;
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_never_advances() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let clock = FixedClock::new(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), at);
    }

    #[test]
    fn stepped_clock_advances_per_call() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let clock = SteppedClock::new(start, Duration::minutes(1));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::minutes(1));
        assert_eq!(clock.now(), start + Duration::minutes(2));
    }
}
