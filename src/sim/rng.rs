//! Launch randomness
//!
//! The engine never calls a global RNG. Draws come through [`LaunchRng`] so
//! a run is reproducible from its seed and tests can pin exact launches.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Source of the two launch draws
pub trait LaunchRng {
    /// Direction in radians, uniform in `[0, TAU)`
    fn launch_angle(&mut self) -> f32;
    /// Distance budget, uniform in `[min, max]`
    fn distance_budget(&mut self, min: f32, max: f32) -> f32;
}

/// Seeded PCG generator
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: Pcg32,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl LaunchRng for SeededRng {
    fn launch_angle(&mut self) -> f32 {
        self.rng.random_range(0.0..std::f32::consts::TAU)
    }

    fn distance_budget(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..=max)
    }
}

/// Replays a fixed list of launches, cycling when exhausted. An empty list
/// launches straight up with the shortest budget.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    launches: Vec<(f32, f32)>,
    next: usize,
    pending_budget: f32,
}

impl ScriptedRng {
    /// Each launch is `(angle, budget)`; the budget is clamped to the
    /// requested range when drawn.
    pub fn new(launches: Vec<(f32, f32)>) -> Self {
        Self {
            launches,
            next: 0,
            pending_budget: 0.0,
        }
    }
}

impl LaunchRng for ScriptedRng {
    fn launch_angle(&mut self) -> f32 {
        if self.launches.is_empty() {
            self.pending_budget = 0.0;
            return 1.5 * std::f32::consts::PI;
        }
        let (angle, budget) = self.launches[self.next % self.launches.len()];
        self.next += 1;
        self.pending_budget = budget;
        angle
    }

    fn distance_budget(&mut self, min: f32, max: f32) -> f32 {
        self.pending_budget.clamp(min, max)
    }
}
