//! Synthetic GSR signal: a slow sine around 50 with uniform noise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MOCK_TICK_MS: u64 = 100;

const PHASE_STEP: f64 = 0.1;
const AMPLITUDE: f64 = 35.0;
const CENTER: f64 = 50.0;
const NOISE_SPAN: f64 = 10.0;

/// Endless stream of whole-number readings in 0..=100, one per tick.
#[derive(Debug, Clone)]
pub struct MockSignal<R = StdRng> {
    phase: f64,
    rng: R,
}

impl MockSignal<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for MockSignal<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> MockSignal<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { phase: 0.0, rng }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn next_reading(&mut self) -> f64 {
        self.phase += PHASE_STEP;
        let base = self.phase.sin() * AMPLITUDE + CENTER;
        let noise = (self.rng.gen_range(0.0..1.0) - 0.5) * NOISE_SPAN;
        (base + noise).floor().clamp(0.0, 100.0)
    }
}

impl<R: Rng> Iterator for MockSignal<R> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_reading())
    }
}
