//! Press-and-hold target sizing
//!
//! The input surface hands the core a held position and hold time; the core
//! only ever sees the resolved [`TargetSpec`].

use glam::Vec2;

use super::ledger::TargetSpec;
use crate::settings::GameConfig;

/// Radius grown by holding for `hold_ms`, clamped to the valid range
pub fn radius_for_hold(hold_ms: u64, config: &GameConfig) -> f32 {
    let min = config.min_radius();
    let max = config.max_radius();
    (min + hold_ms as f32 / config.hold_growth_ms_per_unit).clamp(min, max)
}

/// Resolve a placement gesture into a target spec
pub fn request_bet_placement(position: Vec2, hold_ms: u64, config: &GameConfig) -> TargetSpec {
    TargetSpec {
        center: position,
        radius: radius_for_hold(hold_ms, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_gives_min_radius() {
        let config = GameConfig::default();
        assert_eq!(radius_for_hold(0, &config), config.min_radius());
    }

    #[test]
    fn test_growth_rate() {
        let config = GameConfig::default();
        // 10 ms per unit
        assert_eq!(radius_for_hold(500, &config), config.min_radius() + 50.0);
    }

    #[test]
    fn test_long_hold_clamps() {
        let config = GameConfig::default();
        let spec = request_bet_placement(Vec2::new(10.0, 20.0), 60_000, &config);
        assert_eq!(spec.radius, config.max_radius());
        assert_eq!(spec.center, Vec2::new(10.0, 20.0));
    }
}
