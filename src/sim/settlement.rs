//! Settlement
//!
//! Runs once per round when the puck stops. Every active bet is evaluated
//! against the resting position; there is no first-match short circuit.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ledger::{Bet, BetLedger, Target};
use super::multiplier::payout;
use super::puck::{Puck, PuckPhase};
use crate::history::{Outcome, RoundHistory, RoundHistoryEntry};

/// Resolution of a single bet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledBet {
    pub bet: Bet,
    pub outcome: Outcome,
    pub payout: u64,
    /// Distance from puck centre to target centre
    pub distance: f32,
    /// Local balance after the credit (if any)
    pub balance: u64,
}

/// Puck disc overlaps the target disc
#[inline]
pub fn is_hit(puck_pos: Vec2, puck_radius: f32, target: &Target) -> bool {
    puck_pos.distance(target.center) < puck_radius + target.radius
}

/// Decide a bet against a resting puck without touching any state
pub fn evaluate(puck_pos: Vec2, puck_radius: f32, bet: &Bet, target: &Target) -> (Outcome, u64) {
    if is_hit(puck_pos, puck_radius, target) {
        (Outcome::Win, payout(bet.stake, bet.multiplier))
    } else {
        (Outcome::Loss, 0)
    }
}

/// Settle every active bet against the stopped puck: credit winners,
/// append history, then clear the round's bets and targets.
///
/// Returns an empty list for a round with no bets (nothing is recorded).
/// Does nothing unless the puck is `Stopped`.
pub fn settle(puck: &Puck, ledger: &mut BetLedger, history: &mut RoundHistory) -> Vec<SettledBet> {
    if puck.phase != PuckPhase::Stopped {
        return Vec::new();
    }

    let decided: Vec<(Bet, Outcome, u64, f32)> = ledger
        .bets()
        .iter()
        .filter_map(|bet| {
            let target = ledger.target(bet.target_id)?;
            let (outcome, payout) = evaluate(puck.pos, puck.radius, bet, target);
            Some((bet.clone(), outcome, payout, puck.pos.distance(target.center)))
        })
        .collect();

    let mut settled = Vec::with_capacity(decided.len());
    for (bet, outcome, payout, distance) in decided {
        let balance = if payout > 0 {
            ledger.credit(bet.account_id, payout)
        } else {
            ledger.balance(bet.account_id)
        }
        .unwrap_or(0);

        history.push(RoundHistoryEntry {
            round: bet.round,
            account_id: bet.account_id,
            outcome,
            multiplier: bet.multiplier,
            stake: bet.stake,
            payout,
        });

        settled.push(SettledBet {
            bet,
            outcome,
            payout,
            distance,
            balance,
        });
    }

    ledger.clear_bets();
    settled
}
