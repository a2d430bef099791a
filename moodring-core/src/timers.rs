//! Cooperative interval timers.
//!
//! Nothing here sleeps. The owner polls with the current instant and gets back
//! the handles that are due. Cadences are coarse (tens of ms to minutes), so a
//! flat list scanned on every poll is enough.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    period: Duration,
    next_due: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    timers: Vec<Timer>,
    next_id: u64,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a repeating timer whose first firing is one period after `now`.
    pub fn every(&mut self, period: Duration, now: DateTime<Utc>) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            handle,
            period,
            next_due: now + period,
        });
        handle
    }

    /// Returns false when the handle was not armed.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Fire every due timer once and re-arm it one period after `now`.
    /// Missed periods are not replayed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<TimerHandle> {
        let mut fired = Vec::new();
        for t in &mut self.timers {
            if now >= t.next_due {
                t.next_due = now + t.period;
                fired.push(t.handle);
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap()
    }

    #[test]
    fn fires_after_each_period() {
        let mut timers = TimerSet::new();
        let h = timers.every(Duration::seconds(60), t0());
        assert!(timers.poll(t0() + Duration::seconds(59)).is_empty());
        assert_eq!(timers.poll(t0() + Duration::seconds(60)), vec![h]);
        assert!(timers.poll(t0() + Duration::seconds(61)).is_empty());
        assert_eq!(timers.poll(t0() + Duration::seconds(120)), vec![h]);
    }

    #[test]
    fn late_poll_fires_once_without_catch_up() {
        let mut timers = TimerSet::new();
        let h = timers.every(Duration::seconds(10), t0());
        let late = t0() + Duration::seconds(55);
        assert_eq!(timers.poll(late), vec![h]);
        assert!(timers.poll(late + Duration::seconds(9)).is_empty());
        assert_eq!(timers.poll(late + Duration::seconds(10)), vec![h]);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut timers = TimerSet::new();
        let a = timers.every(Duration::seconds(1), t0());
        let b = timers.every(Duration::seconds(1), t0());
        assert!(timers.cancel(a));
        assert!(!timers.cancel(a));
        assert_eq!(timers.poll(t0() + Duration::seconds(1)), vec![b]);

        timers.cancel_all();
        assert!(timers.is_empty());
        assert!(!timers.is_armed(b));
        assert!(timers.poll(t0() + Duration::seconds(5)).is_empty());
    }
}
