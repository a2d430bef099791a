//! Persisted mood record.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::mood::MoodType;
use crate::time::local_date;

/// One accepted (mood, value) observation. Immutable once created.
///
/// Wire shape (JSON array element in the blob store):
/// `{"id":"1760000000000-calm","moodType":"calm","sensorValue":27,"timestamp":1760000000000,"date":"2026-10-09"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodRecord {
    /// `<epoch millis>-<mood type>`
    pub id: String,
    pub mood_type: MoodType,
    /// Smoothed value at record time.
    pub sensor_value: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Local calendar day of `timestamp`.
    pub date: NaiveDate,
}

impl MoodRecord {
    pub fn new(mood_type: MoodType, sensor_value: f64, at: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            id: format!("{}-{}", at.timestamp_millis(), mood_type.as_str()),
            mood_type,
            sensor_value,
            timestamp: at,
            date: local_date(at, tz),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn id_and_date_derive_from_creation_time() {
        let at = Utc.with_ymd_and_hms(2026, 2, 21, 23, 30, 0).unwrap();
        let r = MoodRecord::new(MoodType::Tension, 37.0, at, chrono_tz::Asia::Tokyo);
        assert_eq!(r.id, format!("{}-tension", at.timestamp_millis()));
        // 23:30 UTC is 08:30 next day in Tokyo
        assert_eq!(r.date.to_string(), "2026-02-22");
    }

    #[test]
    fn json_keys_are_camel_case() {
        let at = Utc.with_ymd_and_hms(2026, 2, 21, 8, 0, 0).unwrap();
        let r = MoodRecord::new(MoodType::VeryCalm, 22.0, at, chrono_tz::UTC);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"moodType\":\"very_calm\""));
        assert!(json.contains("\"sensorValue\":22.0"));
        assert!(json.contains(&format!("\"timestamp\":{}", at.timestamp_millis())));
        assert!(json.contains("\"date\":\"2026-02-21\""));

        let back: MoodRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
