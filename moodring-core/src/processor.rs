//! Smoother + classifier + change gate.
//!
//! The processor owns the rolling window and the last published [`MoodState`].
//! A new state is published only when the mood flips or the mean moves by more
//! than [`CHANGE_EPSILON`]; published values are rounded to whole numbers.

use serde::{Deserialize, Serialize};

use crate::mood::{MoodType, classify};
use crate::smoother::{Smoother, SmootherOutput};

pub const CHANGE_EPSILON: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MoodState {
    pub mood: MoodType,
    /// Rounded smoothed value. 0 means "no signal".
    pub smoothed_value: f64,
}

/// Result of pushing one reading through the processor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Processed {
    /// The smoother produced a value (a mean or a reset).
    pub emitted: bool,
    /// The published state changed.
    pub changed: bool,
    /// Published state after this reading.
    pub state: MoodState,
}

#[derive(Debug, Clone, Default)]
pub struct MoodProcessor {
    smoother: Smoother,
    state: MoodState,
}

impl MoodProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_smoother(smoother: Smoother) -> Self {
        Self {
            smoother,
            state: MoodState::default(),
        }
    }

    pub fn state(&self) -> MoodState {
        self.state
    }

    pub fn window_len(&self) -> usize {
        self.smoother.len()
    }

    /// Unrounded mean of the window.
    pub fn raw_mean(&self) -> f64 {
        self.smoother.mean()
    }

    pub fn ingest(&mut self, reading: f64) -> Processed {
        match self.smoother.ingest(reading) {
            SmootherOutput::Ignored => Processed {
                emitted: false,
                changed: false,
                state: self.state,
            },
            SmootherOutput::Reset => {
                let changed = self.state != MoodState::default();
                self.state = MoodState::default();
                Processed {
                    emitted: true,
                    changed,
                    state: self.state,
                }
            }
            SmootherOutput::Mean(avg) => {
                // Means are always >= the noise floor here; fall back just in case.
                let mood = classify(avg).unwrap_or(self.state.mood);
                let mood_changed = mood != self.state.mood;
                let value_changed = (self.state.smoothed_value - avg).abs() > CHANGE_EPSILON;
                let changed = mood_changed || value_changed;
                if changed {
                    self.state = MoodState {
                        mood,
                        smoothed_value: avg.round(),
                    };
                }
                Processed {
                    emitted: true,
                    changed,
                    state: self.state,
                }
            }
        }
    }

    /// Clear the window and zero the published value in one step.
    pub fn disconnect(&mut self) -> MoodState {
        self.smoother.clear();
        self.state = MoodState::default();
        self.state
    }
}
