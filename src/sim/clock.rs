//! Round clock
//!
//! Phase machine driven by caller-supplied monotonic time. The betting
//! window is anchored on a scheduled timestamp and remaining time is
//! recomputed from it on every update, so a stalled or bursty tick source
//! cannot skip or repeat a launch.

use serde::{Deserialize, Serialize};

use crate::settings::GameConfig;

/// Identifier of a round (increments at every new betting window)
pub type RoundId = u64;

/// Current phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Accepting bets
    Betting,
    /// Final seconds of the betting window; bets rejected
    LockWindow,
    /// Betting window expired; the puck is about to be launched
    Launch,
    /// Puck in flight, waiting for it to stop
    Resolution,
    /// Round settled; next betting window pending
    Cooldown,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::Betting => "betting",
            RoundPhase::LockWindow => "lock",
            RoundPhase::Launch => "launch",
            RoundPhase::Resolution => "resolution",
            RoundPhase::Cooldown => "cooldown",
        }
    }
}

/// Transition observed during an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    RoundStarted(RoundId),
    LockEngaged(RoundId),
    /// Fired exactly once per round
    LaunchDue(RoundId),
    CooldownFinished(RoundId),
}

/// Round phase state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundClock {
    betting_ms: u64,
    lock_ms: u64,
    cooldown_ms: u64,
    round: RoundId,
    phase: RoundPhase,
    /// Scheduled start of the current betting window (None until first update)
    betting_started_at: Option<u64>,
    cooldown_started_at: Option<u64>,
    /// Last round a launch was issued for
    launched_round: Option<RoundId>,
    /// Most recent time seen (clamps clock regressions)
    last_now: u64,
}

impl RoundClock {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            betting_ms: config.betting_ms,
            lock_ms: config.lock_ms,
            cooldown_ms: config.cooldown_ms,
            round: 1,
            phase: RoundPhase::Betting,
            betting_started_at: None,
            cooldown_started_at: None,
            launched_round: None,
            last_now: 0,
        }
    }

    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Bets are accepted only in the open part of the betting window
    pub fn accepts_bets(&self) -> bool {
        self.phase == RoundPhase::Betting
    }

    /// Milliseconds until the next scheduled transition (launch during
    /// betting, next window during cooldown), 0 otherwise
    pub fn time_remaining_ms(&self) -> u64 {
        let now = self.last_now;
        match self.phase {
            RoundPhase::Betting | RoundPhase::LockWindow => self
                .betting_started_at
                .map(|start| (start + self.betting_ms).saturating_sub(now))
                .unwrap_or(self.betting_ms),
            RoundPhase::Cooldown => self
                .cooldown_started_at
                .map(|start| (start + self.cooldown_ms).saturating_sub(now))
                .unwrap_or(0),
            RoundPhase::Launch | RoundPhase::Resolution => 0,
        }
    }

    /// Recompute the phase for `now_ms`. `puck_in_flight` blocks the end of
    /// a betting window while a previous flight is unresolved.
    pub fn update(&mut self, now_ms: u64, puck_in_flight: bool) -> Vec<ClockEvent> {
        let now = now_ms.max(self.last_now);
        self.last_now = now;

        let mut events = Vec::new();
        let start = match self.betting_started_at {
            Some(start) => start,
            None => {
                self.betting_started_at = Some(now);
                events.push(ClockEvent::RoundStarted(self.round));
                now
            }
        };

        if self.phase == RoundPhase::Cooldown {
            let cooldown_end = self.cooldown_started_at.unwrap_or(now) + self.cooldown_ms;
            if now < cooldown_end {
                return events;
            }
            events.push(ClockEvent::CooldownFinished(self.round));
            self.round += 1;
            self.phase = RoundPhase::Betting;
            self.cooldown_started_at = None;
            self.betting_started_at = Some(cooldown_end);
            events.push(ClockEvent::RoundStarted(self.round));
            return self.update_betting(now, cooldown_end, puck_in_flight, events);
        }

        self.update_betting(now, start, puck_in_flight, events)
    }

    fn update_betting(
        &mut self,
        now: u64,
        start: u64,
        puck_in_flight: bool,
        mut events: Vec<ClockEvent>,
    ) -> Vec<ClockEvent> {
        if !matches!(self.phase, RoundPhase::Betting | RoundPhase::LockWindow) {
            return events;
        }

        let elapsed = now.saturating_sub(start);
        let lock_at = self.betting_ms.saturating_sub(self.lock_ms);

        if elapsed >= lock_at && self.phase == RoundPhase::Betting {
            self.phase = RoundPhase::LockWindow;
            events.push(ClockEvent::LockEngaged(self.round));
        }

        if elapsed >= self.betting_ms
            && !puck_in_flight
            && self.launched_round != Some(self.round)
        {
            self.phase = RoundPhase::Launch;
            self.launched_round = Some(self.round);
            events.push(ClockEvent::LaunchDue(self.round));
        }

        events
    }

    /// The puck has been launched for the current round
    pub fn begin_resolution(&mut self) {
        if self.phase == RoundPhase::Launch {
            self.phase = RoundPhase::Resolution;
        }
    }

    /// Settlement finished; start the cooldown at `now_ms`
    pub fn begin_cooldown(&mut self, now_ms: u64) {
        if matches!(self.phase, RoundPhase::Launch | RoundPhase::Resolution) {
            let now = now_ms.max(self.last_now);
            self.last_now = now;
            self.phase = RoundPhase::Cooldown;
            self.cooldown_started_at = Some(now);
        }
    }
}
