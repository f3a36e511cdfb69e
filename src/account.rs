//! Account service seam
//!
//! The engine mirrors every balance change to an [`AccountService`] without
//! waiting on it. The production service is an outbox: an unbounded channel
//! drained by a tokio task that applies updates to an [`AccountBackend`] in
//! order and reports each result back. Losing an in-flight update at
//! shutdown is accepted.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::AccountId;
use crate::error::PersistenceError;
use crate::history::Outcome;
use crate::sim::clock::RoundId;

/// Account as known to the account service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub balance: u64,
}

/// What a balance delta pays for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BalanceReason {
    /// Stake reserved when a bet was accepted
    Stake { round: RoundId, stake: u64 },
    /// Bet resolved; `payout` is credited (0 on a loss)
    Settlement {
        round: RoundId,
        outcome: Outcome,
        stake: u64,
        multiplier: f64,
        payout: u64,
    },
}

/// A balance change to mirror to durable storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub account_id: AccountId,
    pub delta: i64,
    pub reason: BalanceReason,
}

impl BalanceUpdate {
    pub fn stake(account_id: AccountId, round: RoundId, stake: u64) -> Self {
        Self {
            account_id,
            delta: -(stake as i64),
            reason: BalanceReason::Stake { round, stake },
        }
    }

    pub fn settlement(
        account_id: AccountId,
        round: RoundId,
        outcome: Outcome,
        stake: u64,
        multiplier: f64,
        payout: u64,
    ) -> Self {
        Self {
            account_id,
            delta: payout as i64,
            reason: BalanceReason::Settlement {
                round,
                outcome,
                stake,
                multiplier,
                payout,
            },
        }
    }
}

/// Result of mirroring one update
#[derive(Debug)]
pub enum SyncReport {
    Applied { account_id: AccountId, balance: u64 },
    Failed { account_id: AccountId, error: PersistenceError },
}

/// Outbound seam used by the engine. Implementations must not block.
pub trait AccountService: Send {
    /// Queue a balance change (fire-and-forget)
    fn submit(&self, update: BalanceUpdate);

    /// Results that arrived since the last poll
    fn poll_reports(&mut self) -> Vec<SyncReport> {
        Vec::new()
    }
}

/// Durable account storage and identity
pub trait AccountBackend: Send + Sync + 'static {
    /// Look up `username`, creating it with the starting balance if new
    fn authenticate(&self, username: &str) -> Result<Account, PersistenceError>;

    fn get_account(&self, id: AccountId) -> Result<Account, PersistenceError>;

    /// Apply a delta and return the stored balance
    fn adjust_balance(&self, update: &BalanceUpdate) -> Result<u64, PersistenceError>;

    /// Recent settled games, newest first
    fn history(
        &self,
        id: AccountId,
        limit: usize,
    ) -> Result<Vec<crate::persistence::GameRecord>, PersistenceError>;
}

/// Service that drops every update (offline play)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSync;

impl AccountService for NullSync {
    fn submit(&self, update: BalanceUpdate) {
        log::trace!("offline: dropping balance update {:?}", update);
    }
}

/// Service that records submitted updates in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingSync {
    updates: Arc<Mutex<Vec<BalanceUpdate>>>,
}

impl RecordingSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted so far, in order
    pub fn updates(&self) -> Vec<BalanceUpdate> {
        self.updates.lock().clone()
    }
}

impl AccountService for RecordingSync {
    fn submit(&self, update: BalanceUpdate) {
        self.updates.lock().push(update);
    }
}

/// Channel-backed outbox feeding [`spawn_sync_worker`]
#[derive(Debug)]
pub struct OutboxSync {
    tx: mpsc::UnboundedSender<BalanceUpdate>,
    reports: mpsc::UnboundedReceiver<SyncReport>,
}

impl AccountService for OutboxSync {
    fn submit(&self, update: BalanceUpdate) {
        let account_id = update.account_id;
        if self.tx.send(update).is_err() {
            log::warn!("account sync worker stopped; update for {} lost", account_id);
        }
    }

    fn poll_reports(&mut self) -> Vec<SyncReport> {
        let mut reports = Vec::new();
        while let Ok(report) = self.reports.try_recv() {
            reports.push(report);
        }
        reports
    }
}

/// Start the worker that applies queued updates to `backend`, one at a
/// time and in submission order. Must be called inside a tokio runtime.
///
/// The worker exits once the returned [`OutboxSync`] is dropped and the
/// queue is drained.
pub fn spawn_sync_worker<B: AccountBackend>(backend: Arc<B>) -> (OutboxSync, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<BalanceUpdate>();
    let (report_tx, reports) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            let account_id = update.account_id;
            let backend = backend.clone();
            let result = tokio::task::spawn_blocking(move || backend.adjust_balance(&update))
                .await
                .unwrap_or_else(|e| Err(PersistenceError::Unreachable(e.to_string())));

            let report = match result {
                Ok(balance) => {
                    log::debug!("synced account {} balance {}", account_id, balance);
                    SyncReport::Applied { account_id, balance }
                }
                Err(error) => {
                    log::warn!("failed to sync account {}: {}", account_id, error);
                    SyncReport::Failed { account_id, error }
                }
            };
            // Engine may be gone; reports are informational
            let _ = report_tx.send(report);
        }
        log::debug!("account sync worker stopped");
    });

    (OutboxSync { tx, reports }, handle)
}
