//! Game engine
//!
//! Owns every entity of a session and advances them in lockstep. Each
//! `on_tick` recomputes the round phase, then steps the puck if it is in
//! flight, then settles exactly once on the tick the puck stops. A tick
//! never fails and never waits on the account service.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::clock::{ClockEvent, RoundClock, RoundId, RoundPhase};
use super::ledger::{Bet, BetLedger, Target, TargetSpec};
use super::placement::request_bet_placement;
use super::puck::{Puck, PuckPhase, StopReason};
use super::rng::LaunchRng;
use super::settlement::{SettledBet, settle};
use crate::AccountId;
use crate::account::{Account, AccountService, BalanceUpdate, SyncReport};
use crate::error::{BetError, ConfigError};
use crate::history::{RoundHistory, RoundHistoryEntry};
use crate::settings::GameConfig;

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    RoundStarted(RoundId),
    LockEngaged(RoundId),
    Launched {
        round: RoundId,
        angle: f32,
        distance_budget: f32,
    },
    Stopped {
        round: RoundId,
        reason: StopReason,
        pos: Vec2,
    },
    /// Emitted for every round, empty for a house round
    Settled {
        round: RoundId,
        bets: Vec<SettledBet>,
    },
    CooldownFinished(RoundId),
}

/// Render snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub round: RoundId,
    pub phase: RoundPhase,
    pub time_remaining_ms: u64,
    pub puck: Puck,
    pub targets: Vec<Target>,
    /// The session player's bet
    pub active_bet: Option<Bet>,
    /// All active bets (more than one only in multiplayer)
    pub bets: Vec<Bet>,
    pub player_id: AccountId,
    pub balance: u64,
    /// Newest first
    pub history: Vec<RoundHistoryEntry>,
    /// Most recent account sync failure, cleared by the next success
    pub last_sync_error: Option<String>,
}

/// A game session
pub struct Engine {
    config: GameConfig,
    clock: RoundClock,
    puck: Puck,
    ledger: BetLedger,
    history: RoundHistory,
    rng: Box<dyn LaunchRng + Send>,
    accounts: Box<dyn AccountService>,
    player: AccountId,
    last_sync_error: Option<String>,
    /// Updates submitted but not yet reported back
    unacked: u64,
    ticks: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("round", &self.clock.round())
            .field("phase", &self.clock.phase())
            .field("puck", &self.puck)
            .field("player", &self.player)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create a session for `player`. The clock starts on the first tick.
    ///
    /// Fails if `config` does not validate.
    pub fn new(
        config: GameConfig,
        player: &Account,
        rng: impl LaunchRng + Send + 'static,
        accounts: impl AccountService + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut ledger = BetLedger::new(config.multiplayer);
        ledger.join(player.id, player.balance);

        Ok(Self {
            clock: RoundClock::new(&config),
            puck: Puck::new(config.puck_radius, config.launch_origin()),
            history: RoundHistory::new(config.history_cap),
            ledger,
            rng: Box::new(rng),
            accounts: Box::new(accounts),
            player: player.id,
            last_sync_error: None,
            unacked: 0,
            ticks: 0,
            config,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn player_id(&self) -> AccountId {
        self.player
    }

    pub fn round(&self) -> RoundId {
        self.clock.round()
    }

    pub fn phase(&self) -> RoundPhase {
        self.clock.phase()
    }

    pub fn puck(&self) -> &Puck {
        &self.puck
    }

    pub fn history(&self) -> &RoundHistory {
        &self.history
    }

    pub fn balance(&self, account_id: AccountId) -> Option<u64> {
        self.ledger.balance(account_id)
    }

    /// Add another bettor (multiplayer). No effect if already joined.
    pub fn join(&mut self, account: &Account) {
        self.ledger.join(account.id, account.balance);
        log::info!("account {} joined with balance {}", account.id, account.balance);
    }

    /// Adopt the account service's balance after a successful
    /// authentication or sync. Refused while the account has a bet active.
    pub fn reconcile(&mut self, account: &Account) -> bool {
        let local = self.ledger.balance(account.id);
        let applied = self.ledger.reconcile(account.id, account.balance);
        if applied && local != Some(account.balance) {
            log::info!(
                "reconciled account {}: {:?} -> {}",
                account.id,
                local,
                account.balance
            );
        }
        applied
    }

    /// Place the session player's bet
    pub fn place_bet(&mut self, position: Vec2, radius: f32, stake: u64) -> Result<Bet, BetError> {
        let spec = TargetSpec {
            center: position,
            radius,
        };
        self.place_bet_for(self.player, spec, stake)
    }

    /// Place the session player's bet from a press-and-hold gesture
    pub fn place_bet_with_hold(
        &mut self,
        position: Vec2,
        hold_ms: u64,
        stake: u64,
    ) -> Result<Bet, BetError> {
        let spec = request_bet_placement(position, hold_ms, &self.config);
        self.place_bet_for(self.player, spec, stake)
    }

    /// Place a bet for any joined account
    pub fn place_bet_for(
        &mut self,
        account_id: AccountId,
        spec: TargetSpec,
        stake: u64,
    ) -> Result<Bet, BetError> {
        let round = self.clock.round();
        let bet = self.ledger.place_bet(
            account_id,
            spec,
            stake,
            self.clock.phase(),
            round,
            &self.config,
        )?;
        log::info!(
            "round {}: account {} staked {} at {:.2}x (r={:.1})",
            round,
            account_id,
            stake,
            bet.multiplier,
            spec.radius
        );
        self.submit(BalanceUpdate::stake(account_id, round, stake));
        Ok(bet)
    }

    /// Advance clock, physics and settlement to `now_ms` (monotonic)
    pub fn on_tick(&mut self, now_ms: u64) -> Vec<EngineEvent> {
        self.ticks += 1;
        let mut events = Vec::new();

        for event in self.clock.update(now_ms, self.puck.is_in_flight()) {
            match event {
                ClockEvent::RoundStarted(round) => {
                    if !self.puck.is_in_flight() {
                        self.puck.reset(self.config.launch_origin());
                    }
                    log::info!("round {} betting open", round);
                    events.push(EngineEvent::RoundStarted(round));
                }
                ClockEvent::LockEngaged(round) => {
                    log::debug!("round {} locked", round);
                    events.push(EngineEvent::LockEngaged(round));
                }
                ClockEvent::LaunchDue(round) => {
                    events.push(self.launch(round));
                }
                ClockEvent::CooldownFinished(round) => {
                    events.push(EngineEvent::CooldownFinished(round));
                }
            }
        }

        if let Some(reason) = self.puck.step(&self.config) {
            let round = self.clock.round();
            log::info!(
                "round {}: puck stopped at ({:.1}, {:.1}) after {} ticks ({:?})",
                round,
                self.puck.pos.x,
                self.puck.pos.y,
                self.puck.flight_ticks,
                reason
            );
            events.push(EngineEvent::Stopped {
                round,
                reason,
                pos: self.puck.pos,
            });

            let bets = self.settle(round);
            self.clock.begin_cooldown(now_ms);
            events.push(EngineEvent::Settled { round, bets });
        }

        self.drain_sync_reports();
        events
    }

    fn launch(&mut self, round: RoundId) -> EngineEvent {
        if self.puck.phase == PuckPhase::Stopped {
            self.puck.reset(self.config.launch_origin());
        }
        let angle = self.rng.launch_angle();
        let distance_budget = self
            .rng
            .distance_budget(self.config.min_distance_budget, self.config.max_distance_budget);
        self.puck
            .launch(angle, self.config.launch_speed, distance_budget);
        self.clock.begin_resolution();

        log::info!(
            "round {}: launched at {:.3} rad, budget {:.0} ({} bets)",
            round,
            angle,
            distance_budget,
            self.ledger.bets().len()
        );
        EngineEvent::Launched {
            round,
            angle,
            distance_budget,
        }
    }

    fn settle(&mut self, round: RoundId) -> Vec<SettledBet> {
        if self.ledger.bets().is_empty() {
            log::debug!("round {}: house round, nothing to settle", round);
            return Vec::new();
        }

        let settled = settle(&self.puck, &mut self.ledger, &mut self.history);
        for s in &settled {
            log::info!(
                "round {}: account {} {} (stake {}, {:.2}x, payout {}, balance {})",
                round,
                s.bet.account_id,
                s.outcome.as_str(),
                s.bet.stake,
                s.bet.multiplier,
                s.payout,
                s.balance
            );
            self.submit(BalanceUpdate::settlement(
                s.bet.account_id,
                s.bet.round,
                s.outcome,
                s.bet.stake,
                s.bet.multiplier,
                s.payout,
            ));
        }
        settled
    }

    fn submit(&mut self, update: BalanceUpdate) {
        self.unacked += 1;
        self.accounts.submit(update);
    }

    /// Apply sync results. Once every submitted update has been answered a
    /// stored balance is final, so it is reconciled into the ledger.
    fn drain_sync_reports(&mut self) {
        for report in self.accounts.poll_reports() {
            self.unacked = self.unacked.saturating_sub(1);
            match report {
                SyncReport::Applied { account_id, balance } => {
                    log::trace!("account {} persisted balance {}", account_id, balance);
                    self.last_sync_error = None;
                    if self.unacked == 0 {
                        let local = self.ledger.balance(account_id);
                        if local != Some(balance) && self.ledger.reconcile(account_id, balance) {
                            log::info!(
                                "reconciled account {} with stored balance: {:?} -> {}",
                                account_id,
                                local,
                                balance
                            );
                        }
                    }
                }
                SyncReport::Failed { account_id, error } => {
                    log::warn!(
                        "persistence failure for account {}: {}; continuing on local balance",
                        account_id,
                        error
                    );
                    self.last_sync_error = Some(error.to_string());
                }
            }
        }
    }

    /// Snapshot for rendering
    pub fn state(&self) -> EngineState {
        EngineState {
            round: self.clock.round(),
            phase: self.clock.phase(),
            time_remaining_ms: self.clock.time_remaining_ms(),
            puck: self.puck.clone(),
            targets: self.ledger.targets().to_vec(),
            active_bet: self.ledger.active_bet(self.player).cloned(),
            bets: self.ledger.bets().to_vec(),
            player_id: self.player,
            balance: self.ledger.balance(self.player).unwrap_or(0),
            history: self.history.entries().to_vec(),
            last_sync_error: self.last_sync_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{BalanceReason, RecordingSync};
    use crate::error::{LockReason, PersistenceError};
    use crate::history::Outcome;
    use crate::sim::rng::{ScriptedRng, SeededRng};

    const TICK_MS: u64 = 16;

    fn player(balance: u64) -> Account {
        Account {
            id: 1,
            username: "player".into(),
            balance,
        }
    }

    fn engine(balance: u64, launches: Vec<(f32, f32)>) -> (Engine, RecordingSync) {
        let sync = RecordingSync::new();
        let engine = Engine::new(
            GameConfig::default(),
            &player(balance),
            ScriptedRng::new(launches),
            sync.clone(),
        )
        .unwrap();
        (engine, sync)
    }

    /// Where a launch with these draws comes to rest
    fn resting_point(angle: f32, budget: f32) -> Vec2 {
        let config = GameConfig::default();
        let mut puck = Puck::new(config.puck_radius, config.launch_origin());
        puck.launch(angle, config.launch_speed, budget);
        puck.run_to_rest(&config);
        puck.pos
    }

    /// Tick from `start` until the round reaches cooldown; returns the time
    fn run_round(engine: &mut Engine, start: u64) -> u64 {
        let mut now = start;
        loop {
            engine.on_tick(now);
            if engine.phase() == RoundPhase::Cooldown {
                return now;
            }
            now += TICK_MS;
            assert!(now < start + 60_000, "round did not finish");
        }
    }

    #[test]
    fn test_bet_debits_immediately_and_mirrors() {
        let (mut engine, sync) = engine(100, vec![(0.0, 300.0)]);
        engine.on_tick(0);

        engine.place_bet(Vec2::new(400.0, 300.0), 15.0, 30).unwrap();

        assert_eq!(engine.state().balance, 70);
        assert_eq!(sync.updates(), vec![BalanceUpdate::stake(1, 1, 30)]);
    }

    #[test]
    fn test_insufficient_funds() {
        let (mut engine, sync) = engine(100, vec![(0.0, 300.0)]);
        engine.on_tick(0);

        let err = engine.place_bet(Vec2::new(400.0, 300.0), 15.0, 101).unwrap_err();
        assert!(matches!(err, BetError::InsufficientFunds { .. }));
        assert_eq!(engine.state().balance, 100);
        assert!(sync.updates().is_empty());
    }

    #[test]
    fn test_second_bet_before_settlement_locked() {
        let (mut engine, _) = engine(100, vec![(0.0, 300.0)]);
        engine.on_tick(0);
        engine.place_bet(Vec2::new(400.0, 300.0), 15.0, 10).unwrap();

        assert_eq!(
            engine.place_bet(Vec2::new(200.0, 300.0), 30.0, 10),
            Err(BetError::RoundLocked(LockReason::BetActive))
        );
    }

    #[test]
    fn test_bets_rejected_in_lock_window() {
        let (mut engine, _) = engine(100, vec![(0.0, 300.0)]);
        engine.on_tick(0);
        engine.on_tick(26_000);

        assert_eq!(
            engine.place_bet(Vec2::new(400.0, 300.0), 15.0, 10),
            Err(BetError::RoundLocked(LockReason::LockWindow))
        );
    }

    #[test]
    fn test_win_at_target_center() {
        let (angle, budget) = (1.0, 700.0);
        let stop = resting_point(angle, budget);
        let (mut engine, sync) = engine(1000, vec![(angle, budget)]);
        engine.on_tick(0);

        engine.place_bet(stop, engine.config().min_radius(), 10).unwrap();
        run_round(&mut engine, 30_000);

        let state = engine.state();
        assert_eq!(state.puck.pos, stop);
        assert_eq!(state.balance, 1090);
        assert_eq!(state.history.len(), 1);
        let entry = &state.history[0];
        assert_eq!(
            (entry.outcome, entry.multiplier, entry.stake, entry.payout),
            (Outcome::Win, 10.0, 10, 100)
        );
        assert!(state.bets.is_empty());
        assert!(state.targets.is_empty());

        let updates = sync.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].delta, 100);
        assert!(matches!(
            updates[1].reason,
            BalanceReason::Settlement { outcome: Outcome::Win, payout: 100, .. }
        ));
    }

    #[test]
    fn test_loss_far_from_target() {
        let (angle, budget) = (1.0, 700.0);
        let stop = resting_point(angle, budget);
        // Corner farthest from the resting point
        let far = Vec2::new(
            if stop.x < 400.0 { 780.0 } else { 20.0 },
            if stop.y < 300.0 { 580.0 } else { 20.0 },
        );

        let (mut engine, _) = engine(1000, vec![(angle, budget)]);
        engine.on_tick(0);
        let bet = engine.place_bet(far, 20.0, 50).unwrap();
        run_round(&mut engine, 30_000);

        let state = engine.state();
        assert_eq!(state.balance, 950);
        let entry = &state.history[0];
        assert_eq!(
            (entry.outcome, entry.multiplier, entry.stake, entry.payout),
            (Outcome::Loss, bet.multiplier, 50, 0)
        );
    }

    #[test]
    fn test_house_round_has_no_history() {
        let (mut engine, sync) = engine(1000, vec![(2.0, 500.0)]);
        engine.on_tick(0);
        run_round(&mut engine, 30_000);

        assert!(engine.history().is_empty());
        assert!(sync.updates().is_empty());
        assert_eq!(engine.puck().phase, PuckPhase::Stopped);
    }

    #[test]
    fn test_settles_exactly_once() {
        let (mut engine, _) = engine(1000, vec![(1.0, 700.0)]);
        engine.on_tick(0);
        engine.place_bet(Vec2::new(400.0, 300.0), 100.0, 10).unwrap();

        let mut settled = 0;
        for i in 0..2_000u64 {
            for event in engine.on_tick(30_000 + i * TICK_MS) {
                if matches!(event, EngineEvent::Settled { .. }) {
                    settled += 1;
                }
            }
        }
        // 32s of ticks: round 1 resolves, round 2 is still taking bets
        assert_eq!(settled, 1);
        assert_eq!(engine.round(), 2);
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_launch_once_per_betting_window() {
        let sync = RecordingSync::new();
        let mut engine = Engine::new(GameConfig::default(), &player(1000), SeededRng::new(9), sync)
            .unwrap();

        let mut launches = Vec::new();
        let mut started = Vec::new();
        let mut now = 0;
        while now <= 200_000 {
            for event in engine.on_tick(now) {
                match event {
                    EngineEvent::Launched { round, .. } => launches.push(round),
                    EngineEvent::RoundStarted(round) => started.push(round),
                    _ => {}
                }
            }
            now += TICK_MS;
        }

        // Each round launches once and in order
        let expected: Vec<RoundId> = (1..=launches.len() as u64).collect();
        assert_eq!(launches, expected);
        assert!(launches.len() >= started.len() - 1);
        assert!(launches.len() >= 5);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_stalled_ticks_do_not_double_launch() {
        let (mut engine, _) = engine(1000, vec![(1.0, 300.0)]);
        engine.on_tick(0);
        let events = engine.on_tick(500_000);
        let launched = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::Launched { .. }))
            .count();
        assert_eq!(launched, 1);
        assert_eq!(engine.round(), 1);
        assert!(engine.puck().is_in_flight());
    }

    #[test]
    fn test_next_round_resets_puck_and_accepts_bets() {
        let (mut engine, _) = engine(1000, vec![(1.0, 300.0)]);
        engine.on_tick(0);
        let stopped_at = run_round(&mut engine, 30_000);

        engine.on_tick(stopped_at + engine.config().cooldown_ms);
        assert_eq!(engine.round(), 2);
        assert_eq!(engine.phase(), RoundPhase::Betting);
        assert_eq!(engine.puck().phase, PuckPhase::Idle);
        assert!(engine.place_bet(Vec2::new(400.0, 300.0), 50.0, 10).is_ok());
    }

    #[test]
    fn test_hold_placement() {
        let (mut engine, _) = engine(1000, vec![(1.0, 300.0)]);
        engine.on_tick(0);
        let bet = engine.place_bet_with_hold(Vec2::new(400.0, 300.0), 0, 10).unwrap();
        assert_eq!(bet.multiplier, 10.0);
        assert_eq!(engine.state().targets[0].radius, engine.config().min_radius());
    }

    #[test]
    fn test_reconcile_only_without_active_bet() {
        let (mut engine, _) = engine(1000, vec![(1.0, 300.0)]);
        engine.on_tick(0);
        engine.place_bet(Vec2::new(400.0, 300.0), 50.0, 10).unwrap();
        assert!(!engine.reconcile(&player(5000)));

        run_round(&mut engine, 30_000);
        assert!(engine.reconcile(&player(5000)));
        assert_eq!(engine.state().balance, 5000);
    }

    #[test]
    fn test_multiplayer_settles_every_target() {
        let (angle, budget) = (1.0, 700.0);
        let stop = resting_point(angle, budget);
        let config = GameConfig {
            multiplayer: true,
            ..Default::default()
        };
        let mut engine = Engine::new(
            config,
            &player(1000),
            ScriptedRng::new(vec![(angle, budget)]),
            RecordingSync::new(),
        )
        .unwrap();
        let other = Account {
            id: 2,
            username: "other".into(),
            balance: 500,
        };
        engine.join(&other);
        engine.on_tick(0);

        engine.place_bet(stop, 15.0, 10).unwrap();
        engine
            .place_bet_for(2, TargetSpec { center: stop, radius: 60.0 }, 20)
            .unwrap();
        run_round(&mut engine, 30_000);

        assert_eq!(engine.balance(1), Some(1090));
        assert!(engine.balance(2).unwrap() > 480);
        assert_eq!(engine.history().len(), 2);
    }

    struct FailingSync {
        reported: bool,
    }

    impl AccountService for FailingSync {
        fn submit(&self, _update: BalanceUpdate) {}

        fn poll_reports(&mut self) -> Vec<SyncReport> {
            if std::mem::replace(&mut self.reported, true) {
                return Vec::new();
            }
            vec![SyncReport::Failed {
                account_id: 1,
                error: PersistenceError::Unreachable("connection refused".into()),
            }]
        }
    }

    #[test]
    fn test_sync_failure_is_non_fatal() {
        let mut engine = Engine::new(
            GameConfig::default(),
            &player(100),
            ScriptedRng::new(vec![(1.0, 300.0)]),
            FailingSync { reported: false },
        )
        .unwrap();
        engine.on_tick(0);
        engine.place_bet(Vec2::new(400.0, 300.0), 15.0, 10).unwrap();
        engine.on_tick(16);

        let state = engine.state();
        assert_eq!(state.balance, 90);
        assert!(state.last_sync_error.unwrap().contains("connection refused"));
        assert!(state.active_bet.is_some());
    }

    /// Acknowledges every update with a fixed stored balance
    struct StoredBalanceSync {
        balance: u64,
        queued: parking_lot::Mutex<Vec<AccountId>>,
    }

    impl AccountService for StoredBalanceSync {
        fn submit(&self, update: BalanceUpdate) {
            self.queued.lock().push(update.account_id);
        }

        fn poll_reports(&mut self) -> Vec<SyncReport> {
            let balance = self.balance;
            self.queued
                .lock()
                .drain(..)
                .map(|account_id| SyncReport::Applied { account_id, balance })
                .collect()
        }
    }

    #[test]
    fn test_settled_sync_reconciles_stored_balance() {
        let sync = StoredBalanceSync {
            balance: 4000,
            queued: parking_lot::Mutex::new(Vec::new()),
        };
        let mut engine = Engine::new(
            GameConfig::default(),
            &player(1000),
            ScriptedRng::new(vec![(1.0, 300.0)]),
            sync,
        )
        .unwrap();
        engine.on_tick(0);
        engine.place_bet(Vec2::new(400.0, 300.0), 50.0, 10).unwrap();

        // Stake acknowledged while the bet is in play: local balance kept
        engine.on_tick(16);
        assert_eq!(engine.state().balance, 990);

        run_round(&mut engine, 30_000);
        let state = engine.state();
        assert_eq!(state.balance, 4000);
        assert!(state.last_sync_error.is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GameConfig {
            lock_ms: 40_000,
            ..Default::default()
        };
        let result = Engine::new(
            config,
            &player(1000),
            ScriptedRng::new(vec![(1.0, 300.0)]),
            RecordingSync::new(),
        );
        assert!(matches!(result, Err(ConfigError::LockExceedsBetting { .. })));

        let narrow = GameConfig {
            field_width: 100.0,
            ..Default::default()
        };
        let result = Engine::new(narrow, &player(1000), SeededRng::new(1), RecordingSync::new());
        assert!(matches!(
            result,
            Err(ConfigError::OutOfRange { field: "field_width", .. })
        ));
    }

    #[test]
    fn test_state_serializes() {
        let (mut engine, _) = engine(1000, vec![(1.0, 300.0)]);
        engine.on_tick(0);
        let json = serde_json::to_string(&engine.state()).unwrap();
        assert!(json.contains("\"phase\":\"Betting\""));
    }
}
