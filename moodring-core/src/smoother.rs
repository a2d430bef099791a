//! Fixed-capacity moving average over valid readings.

use std::collections::VecDeque;

use crate::mood::NOISE_FLOOR;

pub const WINDOW_SIZE: usize = 50;
/// Upper bound of the smoothed scale. Larger readings are clamped to it.
pub const MAX_READING: f64 = 100.0;

/// What a single reading did to the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmootherOutput {
    /// Reading was accepted; carries the mean of the window after the push.
    Mean(f64),
    /// Disconnect sentinel cleared a non-empty window. Smoothed value is now 0.
    Reset,
    /// Nothing changed (noise, or a disconnect on an already empty window).
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Smoother {
    window: VecDeque<f64>,
    capacity: usize,
}

impl Default for Smoother {
    fn default() -> Self {
        Self::with_capacity(WINDOW_SIZE)
    }
}

impl Smoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current mean, or 0 for an empty window.
    pub fn mean(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    pub fn ingest(&mut self, reading: f64) -> SmootherOutput {
        if reading == 0.0 {
            if self.window.is_empty() {
                return SmootherOutput::Ignored;
            }
            self.window.clear();
            return SmootherOutput::Reset;
        }
        if !reading.is_finite() || reading < NOISE_FLOOR {
            return SmootherOutput::Ignored;
        }

        self.window.push_back(reading.min(MAX_READING));
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
        SmootherOutput::Mean(self.mean())
    }

    /// Drop every buffered reading.
    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_retained_readings() {
        let mut s = Smoother::new();
        assert_eq!(s.ingest(30.0), SmootherOutput::Mean(30.0));
        assert_eq!(s.ingest(40.0), SmootherOutput::Mean(35.0));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn window_never_exceeds_capacity_and_evicts_oldest() {
        let mut s = Smoother::new();
        for i in 0..120 {
            s.ingest(20.0 + i as f64);
            assert!(s.len() <= WINDOW_SIZE);
        }
        // Retained: 90..=139 (20 + 70..=119)
        let expected: f64 = (70..120).map(|i| 20.0 + i as f64).sum::<f64>() / 50.0;
        assert!((s.mean() - expected).abs() < 1e-9);
    }

    #[test]
    fn disconnect_clears_only_non_empty_window() {
        let mut s = Smoother::new();
        assert_eq!(s.ingest(0.0), SmootherOutput::Ignored);
        s.ingest(42.0);
        assert_eq!(s.ingest(0.0), SmootherOutput::Reset);
        assert!(s.is_empty());
        assert_eq!(s.mean(), 0.0);
    }

    #[test]
    fn noise_floor_is_a_no_op() {
        let mut s = Smoother::new();
        s.ingest(30.0);
        assert_eq!(s.ingest(19.9), SmootherOutput::Ignored);
        assert_eq!(s.ingest(-5.0), SmootherOutput::Ignored);
        assert_eq!(s.ingest(f64::NAN), SmootherOutput::Ignored);
        assert_eq!(s.len(), 1);
        assert_eq!(s.ingest(20.0), SmootherOutput::Mean(25.0));
    }

    #[test]
    fn non_finite_dropped_and_overrange_clamped() {
        let mut s = Smoother::new();
        s.ingest(40.0);
        assert_eq!(s.ingest(f64::INFINITY), SmootherOutput::Ignored);
        assert_eq!(s.ingest(f64::NEG_INFINITY), SmootherOutput::Ignored);
        assert_eq!(s.len(), 1);
        assert_eq!(s.ingest(150.0), SmootherOutput::Mean(70.0));
        assert!(s.mean() <= MAX_READING);
    }

    #[test]
    fn sub_floor_after_disconnect_keeps_window_empty() {
        let mut s = Smoother::new();
        s.ingest(45.0);
        s.ingest(0.0);
        assert_eq!(s.ingest(10.0), SmootherOutput::Ignored);
        assert!(s.is_empty());
    }
}
