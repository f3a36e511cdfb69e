//! Puck physics
//!
//! One step per tick: friction, integrate, inelastic wall bounce, then the
//! stop test. Units are field units and ticks; there is no `dt`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::GameConfig;

/// Puck lifecycle within a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuckPhase {
    /// Resting at the launch origin, waiting for the round to launch
    Idle,
    /// Moving
    InFlight,
    /// Came to rest; the resting position decides the round
    Stopped,
}

/// Why a flight ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Speed dropped below the rest threshold
    AtRest,
    /// Travelled the full distance budget
    BudgetExhausted,
    /// Hit the flight tick ceiling
    TickCeiling,
}

/// The simulated puck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puck {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Path length travelled this flight
    pub cumulative_distance: f32,
    /// Path length after which the puck is forced to rest
    pub distance_budget: f32,
    pub phase: PuckPhase,
    /// Ticks spent in flight
    pub flight_ticks: u32,
}

impl Puck {
    pub fn new(radius: f32, origin: Vec2) -> Self {
        Self {
            pos: origin,
            vel: Vec2::ZERO,
            radius,
            cumulative_distance: 0.0,
            distance_budget: 0.0,
            phase: PuckPhase::Idle,
            flight_ticks: 0,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase == PuckPhase::InFlight
    }

    /// Return to idle at `origin` (round boundary)
    pub fn reset(&mut self, origin: Vec2) {
        *self = Self::new(self.radius, origin);
    }

    /// Launch from idle. Returns false if the puck is not idle.
    pub fn launch(&mut self, angle: f32, speed: f32, distance_budget: f32) -> bool {
        if self.phase != PuckPhase::Idle {
            return false;
        }
        self.vel = Vec2::new(angle.cos(), angle.sin()) * speed;
        self.cumulative_distance = 0.0;
        self.distance_budget = distance_budget;
        self.flight_ticks = 0;
        self.phase = PuckPhase::InFlight;
        true
    }

    /// Advance one tick. Returns the stop reason on the single tick where
    /// the puck transitions to `Stopped`, `None` otherwise.
    pub fn step(&mut self, config: &GameConfig) -> Option<StopReason> {
        if self.phase != PuckPhase::InFlight {
            return None;
        }

        self.vel *= config.friction;
        self.pos += self.vel;
        self.cumulative_distance += self.vel.length();
        self.flight_ticks += 1;

        self.bounce(config);

        let reason = if self.vel.length() < config.stop_epsilon {
            Some(StopReason::AtRest)
        } else if self.cumulative_distance >= self.distance_budget {
            Some(StopReason::BudgetExhausted)
        } else if self.flight_ticks >= config.max_flight_ticks {
            Some(StopReason::TickCeiling)
        } else {
            None
        };

        if reason.is_some() {
            self.vel = Vec2::ZERO;
            self.phase = PuckPhase::Stopped;
        }
        reason
    }

    /// Clamp the disc inside the field, inverting and damping the velocity
    /// component of every axis that crossed a wall
    fn bounce(&mut self, config: &GameConfig) {
        let min = Vec2::splat(self.radius);
        let max = (Vec2::new(config.field_width, config.field_height) - self.radius).max(min);

        if self.pos.x < min.x || self.pos.x > max.x {
            self.pos.x = self.pos.x.clamp(min.x, max.x);
            self.vel.x = -self.vel.x * config.restitution;
        }
        if self.pos.y < min.y || self.pos.y > max.y {
            self.pos.y = self.pos.y.clamp(min.y, max.y);
            self.vel.y = -self.vel.y * config.restitution;
        }
    }

    /// Run the current flight to completion; returns ticks taken and why it
    /// stopped, or `None` if the puck was not in flight
    pub fn run_to_rest(&mut self, config: &GameConfig) -> Option<(u32, StopReason)> {
        let mut ticks = 0;
        while self.is_in_flight() {
            ticks += 1;
            if let Some(reason) = self.step(config) {
                return Some((ticks, reason));
            }
        }
        None
    }
}
