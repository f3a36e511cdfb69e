//! Puck Crash - a round-based puck betting game engine
//!
//! Core modules:
//! - `sim`: Deterministic round simulation (clock, physics, bets, settlement)
//! - `history`: Bounded log of recent round outcomes
//! - `account`: Account service seam and the best-effort sync worker
//! - `persistence`: Durable account stores (in-memory and JSON file)
//! - `settings`: Data-driven game configuration

pub mod account;
pub mod error;
pub mod history;
pub mod persistence;
pub mod settings;
pub mod sim;

pub use error::{BetError, ConfigError, PersistenceError};
pub use history::{Outcome, RoundHistory, RoundHistoryEntry};
pub use settings::GameConfig;
pub use sim::{Engine, EngineState, RoundPhase};

/// Account identifier assigned by the account service
pub type AccountId = u64;

/// Game configuration constants (defaults for [`GameConfig`])
pub mod consts {
    /// Field dimensions
    pub const FIELD_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 600.0;

    /// Puck defaults
    pub const PUCK_RADIUS: f32 = 10.0;
    /// Launch speed in field units per tick
    pub const PUCK_LAUNCH_SPEED: f32 = 20.0;
    /// Per-tick velocity retention
    pub const FRICTION: f32 = 0.985;
    /// Velocity retained on a wall bounce
    pub const RESTITUTION: f32 = 0.8;
    /// Speed below which the puck is at rest
    pub const STOP_EPSILON: f32 = 0.1;
    /// Distance budget range (total path length before a forced stop)
    pub const MIN_DISTANCE_BUDGET: f32 = 300.0;
    pub const MAX_DISTANCE_BUDGET: f32 = 1500.0;
    /// Hard ceiling on flight length
    pub const MAX_FLIGHT_TICKS: u32 = 10_000;

    /// Multiplier bounds
    pub const MAX_MULTIPLIER: f64 = 10.0;
    pub const MIN_MULTIPLIER: f64 = 1.0;

    /// Round timing (milliseconds)
    pub const BETTING_DURATION_MS: u64 = 30_000;
    pub const LOCK_WINDOW_MS: u64 = 5_000;
    pub const COOLDOWN_MS: u64 = 3_000;

    /// Press-and-hold growth: milliseconds of hold per unit of radius
    pub const HOLD_GROWTH_MS_PER_UNIT: f32 = 10.0;

    /// Recent outcomes kept in the history log
    pub const HISTORY_CAP: usize = 10;

    /// Balance granted to a newly created account
    pub const STARTING_BALANCE: u64 = 1000;
}
