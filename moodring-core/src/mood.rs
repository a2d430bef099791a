//! Mood states, their thresholds, and the per-mood profile (label, chart color, persona).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Readings (and smoothed values) below this never reach the classifier.
pub const NOISE_FLOOR: f64 = 20.0;

/// Six ordered mood states, calmest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MoodType {
    VeryCalm,
    #[default]
    Calm,
    LightTension,
    Tension,
    Excited,
    VeryExcited,
}

impl MoodType {
    pub const ALL: [MoodType; 6] = [
        MoodType::VeryCalm,
        MoodType::Calm,
        MoodType::LightTension,
        MoodType::Tension,
        MoodType::Excited,
        MoodType::VeryExcited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodType::VeryCalm => "very_calm",
            MoodType::Calm => "calm",
            MoodType::LightTension => "light_tension",
            MoodType::Tension => "tension",
            MoodType::Excited => "excited",
            MoodType::VeryExcited => "very_excited",
        }
    }

    pub fn profile(&self) -> &'static MoodProfile {
        match self {
            MoodType::VeryCalm => &PROFILES[0],
            MoodType::Calm => &PROFILES[1],
            MoodType::LightTension => &PROFILES[2],
            MoodType::Tension => &PROFILES[3],
            MoodType::Excited => &PROFILES[4],
            MoodType::VeryExcited => &PROFILES[5],
        }
    }

    /// Half-open interval `[min, max)` this mood covers. The last one is unbounded.
    pub fn threshold(&self) -> (f64, f64) {
        let p = self.profile();
        (p.threshold_min, p.threshold_max)
    }
}

impl fmt::Display for MoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoodType::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| format!("unknown mood type: {s}"))
    }
}

/// Static presentation and persona data for a mood.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodProfile {
    pub mood: MoodType,
    pub label: &'static str,
    pub threshold_min: f64,
    pub threshold_max: f64,
    pub chart_color: &'static str,
    /// System prompt handed to the chat collaborator while this mood is active.
    pub persona: &'static str,
}

static PROFILES: [MoodProfile; 6] = [
    MoodProfile {
        mood: MoodType::VeryCalm,
        label: "Very calm",
        threshold_min: 20.0,
        threshold_max: 25.0,
        chart_color: "#10b981",
        persona: "You are a quiet meditation guide. The user is deeply calm. \
                  Answer in one short, image-rich sentence and gently anchor them in their breath.",
    },
    MoodProfile {
        mood: MoodType::Calm,
        label: "Calm",
        threshold_min: 25.0,
        threshold_max: 30.0,
        chart_color: "#14b8a6",
        persona: "You are a warm walking companion. The user is relaxed. \
                  Keep the tone light, avoid pressure, and reflect the comfort of the moment.",
    },
    MoodProfile {
        mood: MoodType::LightTension,
        label: "Light tension",
        threshold_min: 30.0,
        threshold_max: 35.0,
        chart_color: "#f59e0b",
        persona: "You are a minimalist focus coach. The user is slightly tense. \
                  Help them pick the one next step and say it plainly.",
    },
    MoodProfile {
        mood: MoodType::Tension,
        label: "Tension",
        threshold_min: 35.0,
        threshold_max: 40.0,
        chart_color: "#f97316",
        persona: "You are a crisp problem solver. The user is under pressure. \
                  Skip reassurance and give at most three concrete steps.",
    },
    MoodProfile {
        mood: MoodType::Excited,
        label: "Excited",
        threshold_min: 40.0,
        threshold_max: 50.0,
        chart_color: "#f43f5e",
        persona: "You are a patient de-escalation partner. The user's energy is high. \
                  Slow down, validate the feeling, and guide one full breath with a physical cue.",
    },
    MoodProfile {
        mood: MoodType::VeryExcited,
        label: "Very excited",
        threshold_min: 50.0,
        threshold_max: f64::INFINITY,
        chart_color: "#dc2626",
        persona: "You are a steady grounding anchor. The user is overwhelmed. \
                  Use short, calm, repetitive instructions: breathe in, hold, breathe out. You are safe.",
    },
];

/// Map a smoothed value to its mood. `None` below the noise floor (or NaN):
/// callers keep the previous mood in that case.
pub fn classify(value: f64) -> Option<MoodType> {
    if value.is_nan() || value < NOISE_FLOOR {
        return None;
    }
    let mood = match value {
        v if v < 25.0 => MoodType::VeryCalm,
        v if v < 30.0 => MoodType::Calm,
        v if v < 35.0 => MoodType::LightTension,
        v if v < 40.0 => MoodType::Tension,
        v if v < 50.0 => MoodType::Excited,
        _ => MoodType::VeryExcited,
    };
    Some(mood)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_half_open() {
        assert_eq!(classify(24.9), Some(MoodType::VeryCalm));
        assert_eq!(classify(25.0), Some(MoodType::Calm));
        assert_eq!(classify(29.99), Some(MoodType::Calm));
        assert_eq!(classify(30.0), Some(MoodType::LightTension));
        assert_eq!(classify(35.0), Some(MoodType::Tension));
        assert_eq!(classify(40.0), Some(MoodType::Excited));
        assert_eq!(classify(49.9), Some(MoodType::Excited));
        assert_eq!(classify(50.0), Some(MoodType::VeryExcited));
        assert_eq!(classify(1000.0), Some(MoodType::VeryExcited));
    }

    #[test]
    fn below_floor_is_unclassified() {
        assert_eq!(classify(19.999), None);
        assert_eq!(classify(0.0), None);
        assert_eq!(classify(f64::NAN), None);
        assert_eq!(classify(20.0), Some(MoodType::VeryCalm));
    }

    #[test]
    fn profiles_partition_the_range() {
        for (i, m) in MoodType::ALL.iter().enumerate() {
            let (lo, hi) = m.threshold();
            assert_eq!(classify(lo), Some(*m));
            if let Some(next) = MoodType::ALL.get(i + 1) {
                assert_eq!(hi, next.threshold().0, "gap after {m}");
            }
        }
        // Sweep the range in small steps: every value lands inside its own mood's interval.
        let mut v = 20.0;
        while v < 80.0 {
            let m = classify(v).unwrap();
            let (lo, hi) = m.threshold();
            assert!(v >= lo && v < hi, "{v} outside {m}");
            v += 0.05;
        }
    }

    #[test]
    fn mood_type_round_trips_through_str() {
        for m in MoodType::ALL {
            assert_eq!(m.as_str().parse::<MoodType>().unwrap(), m);
        }
        assert!("furious".parse::<MoodType>().is_err());
        assert_eq!(MoodType::default(), MoodType::Calm);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&MoodType::LightTension).unwrap();
        assert_eq!(json, "\"light_tension\"");
    }
}
