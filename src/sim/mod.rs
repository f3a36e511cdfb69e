//! Deterministic round simulation
//!
//! All gameplay logic lives here. Given the same config, seed, bet calls
//! and `now` sequence, a run replays exactly:
//! - Caller-supplied time only
//! - Injected RNG only
//! - One physics step per tick
//! - Stable iteration order (placement order)

pub mod clock;
pub mod engine;
pub mod ledger;
pub mod multiplier;
pub mod placement;
pub mod puck;
pub mod rng;
pub mod settlement;

pub use clock::{ClockEvent, RoundClock, RoundId, RoundPhase};
pub use engine::{Engine, EngineEvent, EngineState};
pub use ledger::{Bet, BetLedger, Target, TargetId, TargetSpec};
pub use multiplier::{display_multiplier, multiplier, payout};
pub use placement::{radius_for_hold, request_bet_placement};
pub use puck::{Puck, PuckPhase, StopReason};
pub use rng::{LaunchRng, ScriptedRng, SeededRng};
pub use settlement::{SettledBet, is_hit, settle};
