//! Bet ledger
//!
//! Local balances are the source of truth for gameplay. A stake is debited
//! the moment a bet is accepted; payouts are credited at settlement.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{RoundId, RoundPhase};
use super::multiplier::multiplier;
use crate::AccountId;
use crate::error::{BetError, LockReason};
use crate::settings::GameConfig;

/// Target identifier (unique per engine)
pub type TargetId = u32;

/// Placement request: a resolved position and radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub center: Vec2,
    pub radius: f32,
}

/// A staked payout zone. Immutable once placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub center: Vec2,
    pub radius: f32,
    pub owner_id: AccountId,
    pub multiplier: f64,
    pub stake: u64,
}

/// An accepted bet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub target_id: TargetId,
    pub account_id: AccountId,
    pub round: RoundId,
    pub stake: u64,
    pub multiplier: f64,
}

/// Balances plus the bets and targets of the current round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetLedger {
    balances: BTreeMap<AccountId, u64>,
    /// Placement order
    targets: Vec<Target>,
    /// Placement order
    bets: Vec<Bet>,
    /// One bet per account instead of one system-wide
    multiplayer: bool,
    next_target_id: TargetId,
}

impl BetLedger {
    pub fn new(multiplayer: bool) -> Self {
        Self {
            balances: BTreeMap::new(),
            targets: Vec::new(),
            bets: Vec::new(),
            multiplayer,
            next_target_id: 1,
        }
    }

    /// Register an account with its starting balance. An account already
    /// present keeps its local balance.
    pub fn join(&mut self, account_id: AccountId, balance: u64) {
        self.balances.entry(account_id).or_insert(balance);
    }

    pub fn balance(&self, account_id: AccountId) -> Option<u64> {
        self.balances.get(&account_id).copied()
    }

    /// Overwrite a local balance with an authoritative one. Refused while
    /// the account has a stake in play.
    pub fn reconcile(&mut self, account_id: AccountId, balance: u64) -> bool {
        if self.active_bet(account_id).is_some() {
            return false;
        }
        match self.balances.get_mut(&account_id) {
            Some(local) => {
                *local = balance;
                true
            }
            None => false,
        }
    }

    /// Validate and record a bet, debiting the stake immediately
    pub fn place_bet(
        &mut self,
        account_id: AccountId,
        spec: TargetSpec,
        stake: u64,
        phase: RoundPhase,
        round: RoundId,
        config: &GameConfig,
    ) -> Result<Bet, BetError> {
        let balance = self
            .balance(account_id)
            .ok_or(BetError::UnknownAccount(account_id))?;

        match phase {
            RoundPhase::Betting => {}
            RoundPhase::LockWindow => return Err(BetError::RoundLocked(LockReason::LockWindow)),
            _ => return Err(BetError::RoundLocked(LockReason::WrongPhase)),
        }

        let bet_active = if self.multiplayer {
            self.active_bet(account_id).is_some()
        } else {
            !self.bets.is_empty()
        };
        if bet_active {
            return Err(BetError::RoundLocked(LockReason::BetActive));
        }

        if stake == 0 {
            return Err(BetError::InvalidStake);
        }

        let (min, max) = (config.min_radius(), config.max_radius());
        if !(spec.radius >= min && spec.radius <= max) {
            return Err(BetError::InvalidRadius {
                radius: spec.radius,
                min,
                max,
            });
        }

        let c = spec.center;
        if !(c.x >= 0.0 && c.x <= config.field_width && c.y >= 0.0 && c.y <= config.field_height) {
            return Err(BetError::InvalidPosition { x: c.x, y: c.y });
        }

        if stake > balance {
            return Err(BetError::InsufficientFunds { stake, balance });
        }

        self.balances.insert(account_id, balance - stake);

        let multiplier = multiplier(spec.radius, config.field_height);
        let id = self.next_target_id;
        self.next_target_id += 1;

        self.targets.push(Target {
            id,
            center: spec.center,
            radius: spec.radius,
            owner_id: account_id,
            multiplier,
            stake,
        });

        let bet = Bet {
            target_id: id,
            account_id,
            round,
            stake,
            multiplier,
        };
        self.bets.push(bet.clone());
        Ok(bet)
    }

    /// Add winnings to a local balance; returns the new balance
    pub fn credit(&mut self, account_id: AccountId, amount: u64) -> Option<u64> {
        let balance = self.balances.get_mut(&account_id)?;
        *balance = balance.saturating_add(amount);
        Some(*balance)
    }

    /// Drop all bets and targets. Idempotent.
    pub fn clear_bets(&mut self) {
        self.bets.clear();
        self.targets.clear();
    }

    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn active_bet(&self, account_id: AccountId) -> Option<&Bet> {
        self.bets.iter().find(|b| b.account_id == account_id)
    }
}
