//! moodring-core: signal smoothing, mood classification, history and care notifications

pub mod analytics;
pub mod error;
pub mod mood;
pub mod notify;
pub mod pipeline;
pub mod processor;
pub mod record;
pub mod recorder;
pub mod smoother;
pub mod store;
pub mod throttle;
pub mod time;
pub mod timers;

pub use analytics::{
    AnalyticsAggregator, DailyMoodStats, MoodStat, TimeRange, TimeRangeStats, TrendDataPoint, daily_stats,
    range_stats, trend_data,
};
pub use error::{StoreError, StoreResult};
pub use mood::{MoodProfile, MoodType, classify};
pub use notify::{
    MoodNotification, NoopSink, NotificationAction, NotificationKind, NotificationPolicy, NotificationSink,
    Permission, PolicyPhase,
};
pub use pipeline::{MoodPipeline, PipelineEvent, TickOutcome};
pub use processor::{MoodProcessor, MoodState};
pub use record::MoodRecord;
pub use recorder::MoodRecorder;
pub use smoother::{Smoother, SmootherOutput};
pub use store::{BlobStore, MemoryBlobStore, MoodStore};
pub use throttle::Throttle;
pub use timers::{TimerHandle, TimerSet};
