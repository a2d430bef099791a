//! Mood analytics: daily top-3, arbitrary range breakdowns, and trend points.
//!
//! All aggregates are derived on demand from the stored records and never
//! persisted. Grouping keeps first-encountered order so that equal counts rank
//! in the order the moods first appeared.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::mood::MoodType;
use crate::record::MoodRecord;
use crate::store::{BlobStore, MoodStore};
use crate::time::{display_time, local_date};

pub const TOP_MOODS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodStat {
    pub mood_type: MoodType,
    pub count: usize,
    /// Share of the window total, 0..=100.
    pub percentage: f64,
    /// 1-based, dense.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMoodStats {
    pub date: NaiveDate,
    pub top_moods: Vec<MoodStat>,
    pub total_records: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Today,
    Week,
    Month,
}

impl TimeRange {
    /// Inclusive `(start, end)` dates ending on `today`.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self {
            TimeRange::Today => today,
            TimeRange::Week => today - Duration::days(7),
            TimeRange::Month => today - Duration::days(30),
        };
        (start, today)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeRange::Today => "today",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
        })
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" | "day" => Ok(TimeRange::Today),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            other => Err(format!("unknown time range: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRangeStats {
    pub range: TimeRange,
    /// First date present in the records, `None` when empty.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub all_moods: Vec<MoodStat>,
    pub total_records: usize,
    pub avg_daily_changes: f64,
    pub most_frequent_mood: Option<MoodType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendDataPoint {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub time: String,
    pub mood_type: MoodType,
    pub sensor_value: f64,
    pub label: String,
    pub color: String,
}

/// Count per mood, ranked by count descending. Stable for ties.
fn ranked_counts<'a>(records: impl IntoIterator<Item = &'a MoodRecord>) -> (Vec<MoodStat>, usize) {
    let mut counts: Vec<(MoodType, usize)> = Vec::new();
    let mut total = 0usize;
    for r in records {
        total += 1;
        match counts.iter_mut().find(|(m, _)| *m == r.mood_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((r.mood_type, 1)),
        }
    }
    // sort_by is stable: equal counts keep grouping order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let stats = counts
        .into_iter()
        .enumerate()
        .map(|(i, (mood_type, count))| MoodStat {
            mood_type,
            count,
            percentage: if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            },
            rank: i + 1,
        })
        .collect();
    (stats, total)
}

/// Top-3 breakdown for one day. `None` means "no data", not an error.
pub fn daily_stats(records: &[MoodRecord], date: NaiveDate) -> Option<DailyMoodStats> {
    let (mut stats, total) = ranked_counts(records.iter().filter(|r| r.date == date));
    if total == 0 {
        return None;
    }
    stats.truncate(TOP_MOODS);
    Some(DailyMoodStats {
        date,
        top_moods: stats,
        total_records: total,
    })
}

/// Full breakdown over an already filtered record set.
pub fn range_stats(range: TimeRange, records: &[MoodRecord]) -> TimeRangeStats {
    if records.is_empty() {
        return TimeRangeStats {
            range,
            start_date: None,
            end_date: None,
            all_moods: Vec::new(),
            total_records: 0,
            avg_daily_changes: 0.0,
            most_frequent_mood: None,
        };
    }

    let dates: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();
    let (all_moods, total) = ranked_counts(records);
    let most_frequent_mood = all_moods.first().map(|s| s.mood_type);

    TimeRangeStats {
        range,
        start_date: dates.first().copied(),
        end_date: dates.last().copied(),
        avg_daily_changes: total as f64 / dates.len() as f64,
        all_moods,
        total_records: total,
        most_frequent_mood,
    }
}

/// Presentation points, ascending by timestamp. Re-sorted on every call.
pub fn trend_data(records: &[MoodRecord], tz: Tz) -> Vec<TrendDataPoint> {
    let mut points: Vec<TrendDataPoint> = records
        .iter()
        .map(|r| {
            let profile = r.mood_type.profile();
            TrendDataPoint {
                timestamp: r.timestamp,
                time: display_time(r.timestamp, tz),
                mood_type: r.mood_type,
                sensor_value: r.sensor_value,
                label: profile.label.to_string(),
                color: profile.chart_color.to_string(),
            }
        })
        .collect();
    points.sort_by_key(|p| p.timestamp);
    points
}

/// Holds the current day's stats and recomputes them on records, ticks, and rollover.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsAggregator {
    daily: Option<DailyMoodStats>,
    last_seen_date: Option<NaiveDate>,
}

impl AnalyticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn daily(&self) -> Option<&DailyMoodStats> {
        self.daily.as_ref()
    }

    pub fn last_seen_date(&self) -> Option<NaiveDate> {
        self.last_seen_date
    }

    pub fn refresh<B: BlobStore>(&mut self, store: &mut MoodStore<B>, today: NaiveDate) -> Option<&DailyMoodStats> {
        self.daily = daily_stats(&store.records_by_date(today), today);
        if self.last_seen_date.is_none() {
            self.last_seen_date = Some(today);
        }
        self.daily.as_ref()
    }

    /// Periodic tick: always recompute; returns true when the local day rolled over.
    pub fn tick<B: BlobStore>(&mut self, store: &mut MoodStore<B>, now: DateTime<Utc>, tz: Tz) -> bool {
        let today = local_date(now, tz);
        let rolled = matches!(self.last_seen_date, Some(d) if d != today);
        self.last_seen_date = Some(today);
        self.refresh(store, today);
        rolled
    }

    pub fn clear(&mut self) {
        self.daily = None;
    }
}
