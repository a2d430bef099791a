//! The mood pipeline: throttle → processor → {recorder → analytics, notifications}.
//!
//! One owner, one thread. Readings, timer polls, and user actions all go
//! through `&mut self`, so every transition is observed whole.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::analytics::{
    AnalyticsAggregator, DailyMoodStats, TimeRange, TimeRangeStats, TrendDataPoint, range_stats, trend_data,
};
use crate::mood::MoodType;
use crate::notify::{MoodNotification, NotificationPolicy, NotificationSink};
use crate::processor::{MoodProcessor, MoodState};
use crate::record::MoodRecord;
use crate::recorder::MoodRecorder;
use crate::store::{BlobStore, MoodStore};
use crate::throttle::Throttle;
use crate::time::local_date;
use crate::timers::{TimerHandle, TimerSet};

pub const STATS_TICK_SECS: i64 = 60;
pub const DISMISS_CHECK_MS: i64 = 250;

/// What one raw reading did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineEvent {
    /// Passed the publish throttle.
    pub admitted: bool,
    /// Published state changed on this reading.
    pub changed: bool,
    pub state: MoodState,
    pub record: Option<MoodRecord>,
    pub notification: Option<MoodNotification>,
}

/// What a timer poll did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub stats_refreshed: bool,
    pub rolled_over: bool,
    pub dismissed: Option<MoodNotification>,
}

pub struct MoodPipeline<B: BlobStore, R = StdRng> {
    tz: Tz,
    throttle: Throttle,
    processor: MoodProcessor,
    recorder: MoodRecorder,
    store: MoodStore<B>,
    analytics: AnalyticsAggregator,
    notifications: NotificationPolicy<R>,
    timers: TimerSet,
    stats_tick: Duration,
    stats_timer: Option<TimerHandle>,
    dismiss_timer: Option<TimerHandle>,
}

impl<B: BlobStore> MoodPipeline<B, StdRng> {
    pub fn new(backend: B, tz: Tz) -> Self {
        Self::with_policy(backend, tz, NotificationPolicy::new())
    }
}

impl<B: BlobStore, R: Rng> MoodPipeline<B, R> {
    pub fn with_policy(backend: B, tz: Tz, notifications: NotificationPolicy<R>) -> Self {
        Self {
            tz,
            throttle: Throttle::default(),
            processor: MoodProcessor::new(),
            recorder: MoodRecorder::default(),
            store: MoodStore::new(backend),
            analytics: AnalyticsAggregator::new(),
            notifications,
            timers: TimerSet::new(),
            stats_tick: Duration::seconds(STATS_TICK_SECS),
            stats_timer: None,
            dismiss_timer: None,
        }
    }

    pub fn with_stats_tick(mut self, period: Duration) -> Self {
        self.stats_tick = period;
        self
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_recorder(mut self, recorder: MoodRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn state(&self) -> MoodState {
        self.processor.state()
    }

    pub fn window_len(&self) -> usize {
        self.processor.window_len()
    }

    pub fn store_mut(&mut self) -> &mut MoodStore<B> {
        &mut self.store
    }

    pub fn notifications(&self) -> &NotificationPolicy<R> {
        &self.notifications
    }

    /// Cached stats for the current day, as of the last refresh.
    pub fn daily(&self) -> Option<&DailyMoodStats> {
        self.analytics.daily()
    }

    pub fn timers_armed(&self) -> usize {
        self.timers.len()
    }

    /// Arm the periodic stats tick and the notification dismiss check.
    pub fn start<S: NotificationSink>(&mut self, now: DateTime<Utc>, sink: &mut S) {
        self.notifications.ensure_permission(sink);
        self.analytics.refresh(&mut self.store, local_date(now, self.tz));
        self.stats_timer = Some(self.timers.every(self.stats_tick, now));
        self.dismiss_timer = Some(self.timers.every(Duration::milliseconds(DISMISS_CHECK_MS), now));
        debug!(tick_secs = self.stats_tick.num_seconds(), "pipeline timers armed");
    }

    pub fn on_reading<S: NotificationSink>(&mut self, raw: f64, now: DateTime<Utc>, sink: &mut S) -> PipelineEvent {
        if !self.throttle.admit(now) {
            return PipelineEvent {
                state: self.processor.state(),
                ..PipelineEvent::default()
            };
        }

        let processed = self.processor.ingest(raw);
        let mut event = PipelineEvent {
            admitted: true,
            changed: processed.changed,
            state: processed.state,
            ..PipelineEvent::default()
        };
        if !processed.emitted {
            return event;
        }
        if processed.changed {
            debug!(mood = %processed.state.mood, value = processed.state.smoothed_value, "mood state published");
        }

        let MoodState { mood, smoothed_value } = processed.state;
        event.record = self
            .recorder
            .observe(&mut self.store, mood, smoothed_value, now, self.tz);
        if event.record.is_some() {
            self.analytics.refresh(&mut self.store, local_date(now, self.tz));
        }
        event.notification = self.notifications.observe(mood, now, sink);
        event
    }

    /// Source went away: clear the window and zero the value in one step.
    pub fn disconnect(&mut self) -> MoodState {
        let state = self.processor.disconnect();
        self.throttle.reset();
        // A later spike after reconnecting counts as a fresh entry.
        self.notifications.note_mood(state.mood);
        info!("signal disconnected, pipeline reset");
        state
    }

    /// Run whatever timers are due.
    pub fn poll<S: NotificationSink>(&mut self, now: DateTime<Utc>, sink: &mut S) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        for handle in self.timers.poll(now) {
            if Some(handle) == self.stats_timer {
                outcome.stats_refreshed = true;
                outcome.rolled_over = self.analytics.tick(&mut self.store, now, self.tz);
                if outcome.rolled_over {
                    info!(date = %local_date(now, self.tz), "local day rolled over");
                }
            } else if Some(handle) == self.dismiss_timer {
                outcome.dismissed = self.notifications.expire(now, sink);
            }
        }
        outcome
    }

    /// Teardown: disconnect, drop the on-screen notification, cancel every timer.
    pub fn shutdown<S: NotificationSink>(&mut self, sink: &mut S) {
        self.disconnect();
        self.notifications.dismiss(sink);
        self.timers.cancel_all();
        self.stats_timer = None;
        self.dismiss_timer = None;
    }

    pub fn daily_stats(&mut self, now: DateTime<Utc>) -> Option<DailyMoodStats> {
        self.analytics.refresh(&mut self.store, local_date(now, self.tz)).cloned()
    }

    pub fn records_in(&mut self, range: TimeRange, now: DateTime<Utc>) -> Vec<MoodRecord> {
        let (start, end) = range.bounds(local_date(now, self.tz));
        self.store.records_by_range(start, end)
    }

    pub fn range_stats(&mut self, range: TimeRange, now: DateTime<Utc>) -> TimeRangeStats {
        let records = self.records_in(range, now);
        range_stats(range, &records)
    }

    pub fn trend(&mut self, range: TimeRange, now: DateTime<Utc>) -> Vec<TrendDataPoint> {
        let records = self.records_in(range, now);
        trend_data(&records, self.tz)
    }

    /// Last persisted mood, if any.
    pub fn latest_mood(&mut self) -> Option<MoodType> {
        self.store.all_records().last().map(|r| r.mood_type)
    }

    pub fn clear_all(&mut self) {
        self.store.clear_all();
        self.recorder.reset();
        self.analytics.clear();
        info!("all mood records cleared");
    }

    pub fn clear_before(&mut self, date: NaiveDate, now: DateTime<Utc>) {
        self.store.clear_before(date);
        self.analytics.refresh(&mut self.store, local_date(now, self.tz));
        info!(%date, "mood records before date cleared");
    }
}
