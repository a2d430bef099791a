//! Care notifications on entry into the most extreme mood.
//!
//! A notification fires when the observed mood moves into `very_excited` from
//! anything else and the policy is not cooling down. Transitions during the
//! cooldown are dropped. The shown notification self-dismisses after its
//! duration, independent of the cooldown.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::mood::MoodType;

pub const COOLDOWN_MS: i64 = 5 * 60 * 1000;
pub const AUTO_DISMISS_MS: i64 = 10 * 1000;
pub const MAX_HISTORY: usize = 5;

pub const NOTIFICATION_TITLE: &str = "Mood care reminder";
/// System notifications share one tag so only one is ever on screen.
pub const NOTIFICATION_TAG: &str = "mood-care";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareTemplate {
    pub id: &'static str,
    pub message: &'static str,
}

pub static CARE_TEMPLATES: [CareTemplate; 5] = [
    CareTemplate {
        id: "care_1",
        message: "It looks like things are getting intense. Let's take a slow, deep breath together.",
    },
    CareTemplate {
        id: "care_2",
        message: "Your signal is swinging hard right now, and that's okay. Try slowing your pace for a moment.",
    },
    CareTemplate {
        id: "care_3",
        message: "Feeling the pressure? I'm right here. A few deep breaths will help.",
    },
    CareTemplate {
        id: "care_4",
        message: "Maybe it's time for a short break. Close your eyes and let your shoulders drop.",
    },
    CareTemplate {
        id: "care_5",
        message: "I hear you. Let's try a quick relaxation exercise to find your calm again.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Care,
    Warning,
    Info,
}

/// What a click on the system notification asks the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    OpenChat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub template_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub duration_ms: i64,
    pub mood_type: Option<MoodType>,
}

impl MoodNotification {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.timestamp + Duration::milliseconds(self.duration_ms)
    }

    pub fn click_action(&self) -> NotificationAction {
        NotificationAction::OpenChat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Default,
    Granted,
    Denied,
}

/// System-level notification capability (desktop, browser, phone).
pub trait NotificationSink {
    fn permission(&self) -> Permission;
    fn request_permission(&mut self) -> Permission;
    /// `on_click` is what activating the notification should do.
    fn show(&mut self, title: &str, body: &str, tag: &str, on_click: NotificationAction);
    fn close(&mut self, tag: &str);
}

/// Headless sink: permission is always denied, nothing is shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Denied
    }

    fn show(&mut self, _title: &str, _body: &str, _tag: &str, _on_click: NotificationAction) {}

    fn close(&mut self, _tag: &str) {}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationState {
    pub current: Option<MoodNotification>,
    pub last_notification_time: Option<DateTime<Utc>>,
    /// Template ids of the most recent fires, oldest first.
    pub history: VecDeque<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyPhase {
    Idle,
    Cooldown,
}

pub struct NotificationPolicy<R = StdRng> {
    state: NotificationState,
    previous_mood: Option<MoodType>,
    cooldown: Duration,
    duration: Duration,
    history_cap: usize,
    templates: &'static [CareTemplate],
    rng: R,
}

impl NotificationPolicy<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for NotificationPolicy<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> NotificationPolicy<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            state: NotificationState::default(),
            previous_mood: None,
            cooldown: Duration::milliseconds(COOLDOWN_MS),
            duration: Duration::milliseconds(AUTO_DISMISS_MS),
            history_cap: MAX_HISTORY,
            templates: &CARE_TEMPLATES,
            rng,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_templates(mut self, templates: &'static [CareTemplate]) -> Self {
        self.templates = templates;
        self
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    pub fn current(&self) -> Option<&MoodNotification> {
        self.state.current.as_ref()
    }

    pub fn phase(&self, now: DateTime<Utc>) -> PolicyPhase {
        match self.state.last_notification_time {
            Some(last) if now - last < self.cooldown => PolicyPhase::Cooldown,
            _ => PolicyPhase::Idle,
        }
    }

    /// Ask for the system capability once if the user has not decided yet.
    pub fn ensure_permission<S: NotificationSink>(&self, sink: &mut S) -> Permission {
        match sink.permission() {
            Permission::Default => sink.request_permission(),
            p => p,
        }
    }

    /// Update the transition baseline without any chance of firing.
    pub fn note_mood(&mut self, mood: MoodType) {
        self.previous_mood = Some(mood);
    }

    /// Feed the current mood. Returns the notification when one fires.
    pub fn observe<S: NotificationSink>(
        &mut self,
        mood: MoodType,
        now: DateTime<Utc>,
        sink: &mut S,
    ) -> Option<MoodNotification> {
        let entered = self.previous_mood != Some(MoodType::VeryExcited) && mood == MoodType::VeryExcited;
        self.previous_mood = Some(mood);

        if !entered {
            return None;
        }
        if self.phase(now) == PolicyPhase::Cooldown {
            debug!("very_excited entry suppressed by cooldown");
            return None;
        }
        Some(self.fire(now, sink))
    }

    /// Dismiss the current notification once its duration has elapsed.
    pub fn expire<S: NotificationSink>(&mut self, now: DateTime<Utc>, sink: &mut S) -> Option<MoodNotification> {
        let due = self
            .state
            .current
            .as_ref()
            .is_some_and(|n| now >= n.expires_at());
        if !due {
            return None;
        }
        sink.close(NOTIFICATION_TAG);
        self.state.current.take()
    }

    pub fn dismiss<S: NotificationSink>(&mut self, sink: &mut S) {
        sink.close(NOTIFICATION_TAG);
        self.state.current = None;
    }

    fn select_template(&mut self) -> CareTemplate {
        let fresh: Vec<&CareTemplate> = self
            .templates
            .iter()
            .filter(|t| !self.state.history.iter().any(|h| h == t.id))
            .collect();
        let pool: Vec<&CareTemplate> = if fresh.is_empty() {
            self.templates.iter().collect()
        } else {
            fresh
        };
        *pool[self.rng.gen_range(0..pool.len())]
    }

    fn fire<S: NotificationSink>(&mut self, now: DateTime<Utc>, sink: &mut S) -> MoodNotification {
        let template = self.select_template();
        let notification = MoodNotification {
            id: format!("notification-{}", now.timestamp_millis()),
            kind: NotificationKind::Care,
            message: template.message.to_string(),
            template_id: template.id.to_string(),
            timestamp: now,
            duration_ms: self.duration.num_milliseconds(),
            mood_type: Some(MoodType::VeryExcited),
        };

        if sink.permission() == Permission::Granted {
            sink.close(NOTIFICATION_TAG);
            sink.show(
                NOTIFICATION_TITLE,
                &notification.message,
                NOTIFICATION_TAG,
                notification.click_action(),
            );
        } else {
            debug!("system notifications unavailable, in-app only");
        }

        self.state.history.push_back(template.id.to_string());
        while self.state.history.len() > self.history_cap {
            self.state.history.pop_front();
        }
        self.state.last_notification_time = Some(now);
        self.state.current = Some(notification.clone());
        info!(template = template.id, "care notification fired");
        notification
    }
}
