//! Target size to payout multiplier
//!
//! Smaller targets pay more. The curve is linear in diameter between
//! `field_height / 20` (cap) and `field_height * 0.8` (floor).

use crate::consts::{MAX_MULTIPLIER, MIN_MULTIPLIER};

/// Payout multiplier for a target of `radius` on a field of `field_height`
pub fn multiplier(radius: f32, field_height: f32) -> f64 {
    let diameter = 2.0 * radius as f64;
    let min_diameter = field_height as f64 / 20.0;
    let max_diameter = field_height as f64 * 0.8;

    if diameter <= min_diameter {
        return MAX_MULTIPLIER;
    }
    if diameter >= max_diameter {
        return MIN_MULTIPLIER;
    }

    let ratio = (diameter - min_diameter) / (max_diameter - min_diameter);
    (MAX_MULTIPLIER - ratio * (MAX_MULTIPLIER - MIN_MULTIPLIER)).max(MIN_MULTIPLIER)
}

/// Credited amount for a winning stake
#[inline]
pub fn payout(stake: u64, multiplier: f64) -> u64 {
    (stake as f64 * multiplier).floor() as u64
}

/// Multiplier rounded for display (two decimals)
pub fn display_multiplier(multiplier: f64) -> String {
    format!("{:.2}x", multiplier)
}
