//! Publish-rate limiter for raw readings.
//!
//! Readings arriving inside the interval are dropped, not queued.

use chrono::{DateTime, Duration, Utc};

pub const PUBLISH_INTERVAL_MS: i64 = 50;

#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_publish: Option<DateTime<Utc>>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Duration::milliseconds(PUBLISH_INTERVAL_MS))
    }
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_publish: None,
        }
    }

    /// Returns true (and records `now`) when strictly more than one interval has
    /// elapsed since the last accepted publish.
    pub fn admit(&mut self, now: DateTime<Utc>) -> bool {
        let ok = match self.last_publish {
            None => true,
            Some(last) => now - last > self.interval,
        };
        if ok {
            self.last_publish = Some(now);
        }
        ok
    }

    pub fn reset(&mut self) {
        self.last_publish = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn first_reading_is_admitted_then_rate_limited() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut th = Throttle::default();
        assert!(th.admit(t0));
        assert!(!th.admit(t0 + Duration::milliseconds(10)));
        // exactly one interval is not enough
        assert!(!th.admit(t0 + Duration::milliseconds(50)));
        assert!(th.admit(t0 + Duration::milliseconds(51)));
    }

    #[test]
    fn burst_of_hundreds_per_second_is_bounded() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut th = Throttle::default();
        // 500 readings over one second, every 2 ms
        let admitted = (0..500)
            .filter(|i| th.admit(t0 + Duration::milliseconds(i * 2)))
            .count();
        assert!(admitted <= 20, "admitted {admitted}");
        assert!(admitted >= 19);
    }
}
