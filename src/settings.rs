//! Game configuration
//!
//! Loaded from a JSON file; any missing field falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Tunable game parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === Field ===
    pub field_width: f32,
    pub field_height: f32,

    // === Puck physics ===
    pub puck_radius: f32,
    /// Launch speed (units per tick)
    pub launch_speed: f32,
    /// Velocity multiplier applied every tick (< 1)
    pub friction: f32,
    /// Velocity retained on a wall bounce (< 1)
    pub restitution: f32,
    /// Puck is at rest below this speed
    pub stop_epsilon: f32,
    pub min_distance_budget: f32,
    pub max_distance_budget: f32,
    /// Forced stop after this many ticks in flight
    pub max_flight_ticks: u32,

    // === Round timing (ms) ===
    pub betting_ms: u64,
    /// Final part of the betting window where bets are rejected
    pub lock_ms: u64,
    pub cooldown_ms: u64,

    // === Bets ===
    /// Hold duration (ms) per unit of target radius
    pub hold_growth_ms_per_unit: f32,
    /// One active bet per account instead of one system-wide
    pub multiplayer: bool,

    // === History ===
    pub history_cap: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,

            puck_radius: PUCK_RADIUS,
            launch_speed: PUCK_LAUNCH_SPEED,
            friction: FRICTION,
            restitution: RESTITUTION,
            stop_epsilon: STOP_EPSILON,
            min_distance_budget: MIN_DISTANCE_BUDGET,
            max_distance_budget: MAX_DISTANCE_BUDGET,
            max_flight_ticks: MAX_FLIGHT_TICKS,

            betting_ms: BETTING_DURATION_MS,
            lock_ms: LOCK_WINDOW_MS,
            cooldown_ms: COOLDOWN_MS,

            hold_growth_ms_per_unit: HOLD_GROWTH_MS_PER_UNIT,
            multiplayer: false,

            history_cap: HISTORY_CAP,
        }
    }
}

impl GameConfig {
    /// Smallest target diameter (maximum multiplier)
    pub fn min_diameter(&self) -> f32 {
        self.field_height / 20.0
    }

    /// Largest target diameter (multiplier floor)
    pub fn max_diameter(&self) -> f32 {
        self.field_height * 0.8
    }

    pub fn min_radius(&self) -> f32 {
        self.min_diameter() / 2.0
    }

    pub fn max_radius(&self) -> f32 {
        self.max_diameter() / 2.0
    }

    /// Where the puck sits before launch (bottom centre)
    pub fn launch_origin(&self) -> glam::Vec2 {
        glam::Vec2::new(self.field_width / 2.0, self.field_height - 50.0)
    }

    /// Load configuration from a JSON file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        log::info!("Loaded game config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse configuration from a JSON string and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("field_width", self.field_width)?;
        positive("field_height", self.field_height)?;
        positive("puck_radius", self.puck_radius)?;
        positive("launch_speed", self.launch_speed)?;
        positive("stop_epsilon", self.stop_epsilon)?;
        positive("hold_growth_ms_per_unit", self.hold_growth_ms_per_unit)?;
        unit_open("friction", self.friction)?;
        unit_open("restitution", self.restitution)?;

        if self.puck_radius * 2.0 >= self.field_width.min(self.field_height) {
            return Err(ConfigError::OutOfRange {
                field: "puck_radius",
                requirement: "smaller than half the field",
                value: self.puck_radius as f64,
            });
        }
        if self.field_width < self.max_diameter() {
            return Err(ConfigError::OutOfRange {
                field: "field_width",
                requirement: "at least the largest target diameter (0.8 x field_height)",
                value: self.field_width as f64,
            });
        }
        if !(self.min_distance_budget > 0.0 && self.min_distance_budget <= self.max_distance_budget)
        {
            return Err(ConfigError::EmptyDistanceRange {
                min: self.min_distance_budget,
                max: self.max_distance_budget,
            });
        }
        if self.max_flight_ticks == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_flight_ticks",
                requirement: "at least 1",
                value: 0.0,
            });
        }
        if self.betting_ms == 0 {
            return Err(ConfigError::OutOfRange {
                field: "betting_ms",
                requirement: "at least 1",
                value: 0.0,
            });
        }
        if self.lock_ms >= self.betting_ms {
            return Err(ConfigError::LockExceedsBetting {
                lock_ms: self.lock_ms,
                betting_ms: self.betting_ms,
            });
        }
        if self.history_cap == 0 {
            return Err(ConfigError::OutOfRange {
                field: "history_cap",
                requirement: "at least 1",
                value: 0.0,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "a positive number",
            value: value as f64,
        })
    }
}

fn unit_open(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "in (0, 1)",
            value: value as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_radius_bounds() {
        let config = GameConfig::default();
        assert_eq!(config.min_radius(), 15.0);
        assert_eq!(config.max_radius(), 240.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json(r#"{ "betting_ms": 10000, "multiplayer": true }"#)
            .unwrap();
        assert_eq!(config.betting_ms, 10_000);
        assert!(config.multiplayer);
        assert_eq!(config.lock_ms, LOCK_WINDOW_MS);
        assert_eq!(config.friction, FRICTION);
    }

    #[test]
    fn test_lock_window_must_fit() {
        let err = GameConfig::from_json(r#"{ "betting_ms": 4000, "lock_ms": 5000 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::LockExceedsBetting { .. }));
    }

    #[test]
    fn test_field_must_fit_largest_target() {
        let err = GameConfig::from_json(r#"{ "field_width": 100.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "field_width", .. }));

        let narrow = GameConfig {
            field_width: 480.0,
            ..Default::default()
        };
        assert!(narrow.validate().is_ok());
        assert!(narrow.field_width - narrow.max_radius() >= narrow.max_radius());
    }

    #[test]
    fn test_friction_must_decay() {
        let config = GameConfig {
            friction: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "friction", .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        std::fs::write(&path, r#"{ "cooldown_ms": 1500 }"#).unwrap();

        let config = GameConfig::load(&path).unwrap();
        assert_eq!(config.cooldown_ms, 1500);
    }
}
