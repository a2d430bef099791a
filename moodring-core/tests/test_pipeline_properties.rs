use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use moodring_core::store::STORAGE_KEY;
use moodring_core::{
    BlobStore, MemoryBlobStore, MoodPipeline, MoodType, NoopSink, NotificationPolicy, PipelineEvent, Smoother, SmootherOutput,
    TimeRange,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap()
}

fn pipeline() -> MoodPipeline<MemoryBlobStore> {
    MoodPipeline::with_policy(MemoryBlobStore::new(), chrono_tz::UTC, NotificationPolicy::seeded(5))
}

fn step(p: &mut MoodPipeline<MemoryBlobStore>, value: f64, at: &mut DateTime<Utc>) -> PipelineEvent {
    *at += Duration::milliseconds(100);
    p.on_reading(value, *at, &mut NoopSink)
}

/// Window never exceeds capacity and always averages exactly what it retained.
#[test]
fn smoother_mean_tracks_retained_readings() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut smoother = Smoother::new();
    let mut shadow: Vec<f64> = Vec::new();

    for _ in 0..2_000 {
        let roll: f64 = rng.gen_range(0.0..1.0);
        let reading = if roll < 0.02 { 0.0 } else { rng.gen_range(0.0..100.0) };

        match smoother.ingest(reading) {
            SmootherOutput::Reset => {
                assert!(!shadow.is_empty());
                shadow.clear();
            }
            SmootherOutput::Ignored => {
                assert!(reading < 20.0);
            }
            SmootherOutput::Mean(mean) => {
                shadow.push(reading);
                if shadow.len() > 50 {
                    shadow.remove(0);
                }
                let expected = shadow.iter().sum::<f64>() / shadow.len() as f64;
                assert!((mean - expected).abs() < 1e-9);
            }
        }
        assert!(smoother.len() <= 50);
        assert_eq!(smoother.len(), shadow.len());
    }
}

#[test]
fn zero_resets_and_sub_floor_readings_are_no_ops() {
    let mut p = pipeline();
    p.on_reading(45.0, t0(), &mut NoopSink);
    let ev = p.on_reading(0.0, t0() + Duration::milliseconds(100), &mut NoopSink);
    assert!(ev.changed);
    assert_eq!(ev.state.smoothed_value, 0.0);
    assert_eq!(p.window_len(), 0);

    let ev = p.on_reading(12.0, t0() + Duration::milliseconds(200), &mut NoopSink);
    assert!(!ev.changed);
    assert_eq!(p.window_len(), 0);
    assert_eq!(p.state().smoothed_value, 0.0);
}

#[test]
fn ten_seconds_at_ten_hertz_persists_at_most_three_records() {
    let mut p = pipeline();
    for i in 0..100 {
        p.on_reading(36.0, t0() + Duration::milliseconds(i * 100), &mut NoopSink);
    }
    let n = p.store_mut().len();
    assert!((2..=3).contains(&n), "persisted {n}");
}

#[test]
fn spike_notifies_once_then_cools_down() {
    let mut p = pipeline();
    let mut now = t0();
    assert_eq!(step(&mut p, 27.0, &mut now).state.mood, MoodType::Calm);
    let ev = step(&mut p, 80.0, &mut now);
    assert_eq!(ev.state.mood, MoodType::VeryExcited);
    let first = ev.notification.expect("entry into very_excited notifies");
    assert_eq!(first.duration_ms, 10_000);

    for _ in 0..20 {
        assert!(step(&mut p, 80.0, &mut now).notification.is_none());
    }

    // leave and re-enter inside the cooldown
    p.disconnect();
    step(&mut p, 27.0, &mut now);
    assert!(step(&mut p, 80.0, &mut now).notification.is_none());

    // after five minutes a fresh entry fires again
    p.disconnect();
    now = first.timestamp + Duration::minutes(5);
    step(&mut p, 27.0, &mut now);
    let again = step(&mut p, 80.0, &mut now).notification;
    assert!(again.is_some());
    assert_ne!(again.map(|n| n.template_id), Some(first.template_id));
}

#[test]
fn notification_auto_dismisses_on_poll() {
    let mut p = pipeline();
    p.start(t0(), &mut NoopSink);
    p.on_reading(90.0, t0(), &mut NoopSink);
    assert!(p.notifications().current().is_some());

    let out = p.poll(t0() + Duration::seconds(5), &mut NoopSink);
    assert!(out.dismissed.is_none());
    let out = p.poll(t0() + Duration::seconds(11), &mut NoopSink);
    assert!(out.dismissed.is_some());
    assert!(p.notifications().current().is_none());
}

#[test]
fn day_rollover_drops_yesterday_without_new_readings() {
    let evening = Utc.with_ymd_and_hms(2026, 2, 20, 23, 58, 30).unwrap();
    let mut p = pipeline();
    p.start(evening, &mut NoopSink);
    p.on_reading(27.0, evening, &mut NoopSink);
    assert_eq!(p.daily().map(|d| d.total_records), Some(1));

    let out = p.poll(evening + Duration::seconds(60), &mut NoopSink);
    assert!(out.stats_refreshed);
    assert!(!out.rolled_over);

    let out = p.poll(evening + Duration::seconds(120), &mut NoopSink);
    assert!(out.rolled_over);
    assert!(p.daily().is_none());
}

#[test]
fn range_stats_average_over_distinct_days() {
    let mut p = pipeline();
    let moods = [MoodType::Calm, MoodType::Tension, MoodType::Excited];
    for day in 0..3 {
        for (k, mood) in moods.iter().enumerate() {
            let at = t0() + Duration::days(day) + Duration::minutes(k as i64);
            let record = moodring_core::MoodRecord::new(*mood, 30.0, at, chrono_tz::UTC);
            p.store_mut().save_record(record);
        }
    }
    let now = t0() + Duration::days(2);
    let stats = p.range_stats(TimeRange::Week, now);
    assert_eq!(stats.total_records, 9);
    assert_eq!(stats.avg_daily_changes, 3.0);
    assert_eq!(stats.all_moods.len(), 3);

    let trend = p.trend(TimeRange::Week, now);
    assert_eq!(trend.len(), 9);
    assert!(trend.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let today = p.range_stats(TimeRange::Today, now);
    assert_eq!(today.total_records, 3);
}

#[test]
fn corrupted_history_self_heals() {
    let mut backend = MemoryBlobStore::new();
    backend.set(STORAGE_KEY, "[{\"id\":").unwrap();
    let mut p = MoodPipeline::with_policy(backend, chrono_tz::UTC, NotificationPolicy::seeded(1));

    assert!(p.daily_stats(t0()).is_none());
    let ev = p.on_reading(33.0, t0(), &mut NoopSink);
    assert!(ev.record.is_some());
    assert_eq!(p.store_mut().len(), 1);
}

#[test]
fn clear_before_keeps_the_boundary_day() {
    let mut p = pipeline();
    for day in 0..4 {
        let at = t0() + Duration::days(day);
        p.store_mut()
            .save_record(moodring_core::MoodRecord::new(MoodType::Calm, 27.0, at, chrono_tz::UTC));
    }
    let boundary = NaiveDate::from_ymd_opt(2026, 2, 22).unwrap();
    p.clear_before(boundary, t0() + Duration::days(3));
    let left = p.store_mut().all_records();
    assert_eq!(left.len(), 2);
    assert_eq!(left[0].date, boundary);
}

#[test]
fn out_of_range_readings_keep_history_intact() {
    let mut p = pipeline();
    for i in 0..5 {
        let ev = p.on_reading(36.0, t0() + Duration::seconds(i * 6), &mut NoopSink);
        assert!(ev.record.is_some());
    }
    assert_eq!(p.store_mut().len(), 5);

    let mut now = t0() + Duration::seconds(40);
    let ev = p.on_reading(f64::INFINITY, now, &mut NoopSink);
    assert!(ev.record.is_none());
    assert!(p.state().smoothed_value.is_finite());

    now += Duration::seconds(6);
    let ev = p.on_reading(150.0, now, &mut NoopSink);
    assert!(ev.state.smoothed_value <= 100.0);
    assert!(ev.record.is_some());

    now += Duration::seconds(6);
    let ev = p.on_reading(30.0, now, &mut NoopSink);
    assert!(ev.state.smoothed_value <= 100.0);

    let records = p.store_mut().all_records();
    assert_eq!(records.len(), 7);
    assert!(records.iter().all(|r| r.sensor_value.is_finite() && r.sensor_value <= 100.0));
}
