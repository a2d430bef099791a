//! Decides which (mood, value) observations get persisted.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::mood::{MoodType, NOISE_FLOOR};
use crate::record::MoodRecord;
use crate::store::{BlobStore, MoodStore};

pub const MIN_RECORD_INTERVAL_MS: i64 = 5000;

/// Process-wide debounce: at most one record per interval, whatever the mood.
#[derive(Debug, Clone)]
pub struct MoodRecorder {
    min_interval: Duration,
    last_record_at: Option<DateTime<Utc>>,
}

impl Default for MoodRecorder {
    fn default() -> Self {
        Self::new(Duration::milliseconds(MIN_RECORD_INTERVAL_MS))
    }
}

impl MoodRecorder {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_record_at: None,
        }
    }

    pub fn last_record_at(&self) -> Option<DateTime<Utc>> {
        self.last_record_at
    }

    pub fn is_record_worthy(&self, value: f64, now: DateTime<Utc>) -> bool {
        // serde_json cannot round-trip a non-finite value.
        if !value.is_finite() || value < NOISE_FLOOR {
            return false;
        }
        match self.last_record_at {
            None => true,
            Some(last) => now - last >= self.min_interval,
        }
    }

    /// Persist a record when the observation is record-worthy.
    pub fn observe<B: BlobStore>(
        &mut self,
        store: &mut MoodStore<B>,
        mood: MoodType,
        value: f64,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Option<MoodRecord> {
        if !self.is_record_worthy(value, now) {
            return None;
        }
        let record = MoodRecord::new(mood, value, now, tz);
        // The debounce window advances even if the backend drops the write.
        store.save_record(record.clone());
        self.last_record_at = Some(now);
        debug!(id = %record.id, value, "mood recorded");
        Some(record)
    }

    /// Forget the debounce anchor (used after clearing all data).
    pub fn reset(&mut self) {
        self.last_record_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;
    use chrono::TimeZone;

    #[test]
    fn debounces_across_moods() {
        let t0 = Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap();
        let mut store = MoodStore::new(MemoryBlobStore::new());
        let mut r = MoodRecorder::default();

        assert!(r.observe(&mut store, MoodType::Calm, 27.0, t0, chrono_tz::UTC).is_some());
        let t1 = t0 + Duration::milliseconds(4999);
        assert!(r.observe(&mut store, MoodType::VeryExcited, 60.0, t1, chrono_tz::UTC).is_none());
        let t2 = t0 + Duration::milliseconds(5000);
        assert!(r.observe(&mut store, MoodType::VeryExcited, 60.0, t2, chrono_tz::UTC).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn ignores_invalid_values() {
        let t0 = Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap();
        let r = MoodRecorder::default();
        assert!(!r.is_record_worthy(0.0, t0));
        assert!(!r.is_record_worthy(19.0, t0));
        assert!(!r.is_record_worthy(f64::NAN, t0));
        assert!(!r.is_record_worthy(f64::INFINITY, t0));
        assert!(r.is_record_worthy(20.0, t0));
    }

    #[test]
    fn ten_seconds_of_fast_input_yields_at_most_three_records() {
        let t0 = Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap();
        let mut store = MoodStore::new(MemoryBlobStore::new());
        let mut r = MoodRecorder::default();
        for i in 0..100 {
            let now = t0 + Duration::milliseconds(i * 100);
            r.observe(&mut store, MoodType::Tension, 36.0, now, chrono_tz::UTC);
        }
        let n = store.len();
        assert!((2..=3).contains(&n), "recorded {n}");
    }
}
