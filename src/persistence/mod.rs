//! Durable account stores
//!
//! Two [`AccountBackend`] implementations over the same table layout:
//! - [`MemoryStore`]: process-local, for tests and offline demos
//! - [`JsonFileStore`]: a single JSON document replaced atomically
//!   (write temp file, then rename) after every mutation
//!
//! Only balances need durability. Settlements are also kept as game records
//! so a profile can show its recent results.

mod file;

pub use file::JsonFileStore;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::AccountId;
use crate::account::{Account, AccountBackend, BalanceReason, BalanceUpdate};
use crate::consts::STARTING_BALANCE;
use crate::error::PersistenceError;
use crate::history::Outcome;

/// Default number of records returned by a history query
pub const HISTORY_LIMIT: usize = 10;

/// A settled game as stored for an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: u64,
    pub user_id: AccountId,
    pub result: Outcome,
    pub bet_amount: u64,
    pub multiplier: f64,
    pub win_amount: u64,
    pub created_at: DateTime<Utc>,
}

/// Stored account row
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRow {
    username: String,
    balance: u64,
}

/// Table contents shared by both stores
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreData {
    next_user_id: AccountId,
    next_game_id: u64,
    users: BTreeMap<AccountId, UserRow>,
    games: Vec<GameRecord>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            next_user_id: 1,
            next_game_id: 1,
            users: BTreeMap::new(),
            games: Vec::new(),
        }
    }
}

impl StoreData {
    /// Returns the account and whether it was created
    fn authenticate(&mut self, username: &str) -> Result<(Account, bool), PersistenceError> {
        let username = username.trim();
        if username.chars().count() < 2 {
            return Err(PersistenceError::InvalidUsername);
        }

        if let Some(account) = self.find(username) {
            return Ok((account, false));
        }

        let id = self.next_user_id;
        self.next_user_id += 1;
        self.users.insert(
            id,
            UserRow {
                username: username.to_string(),
                balance: STARTING_BALANCE,
            },
        );
        log::info!("created account {} for {}", id, username);
        Ok((
            Account {
                id,
                username: username.to_string(),
                balance: STARTING_BALANCE,
            },
            true,
        ))
    }

    fn find(&self, username: &str) -> Option<Account> {
        let username = username.trim();
        self.users
            .iter()
            .find(|(_, row)| row.username == username)
            .map(|(&id, row)| Account {
                id,
                username: row.username.clone(),
                balance: row.balance,
            })
    }

    fn get_account(&self, id: AccountId) -> Result<Account, PersistenceError> {
        self.users
            .get(&id)
            .map(|row| Account {
                id,
                username: row.username.clone(),
                balance: row.balance,
            })
            .ok_or(PersistenceError::AccountNotFound(id))
    }

    fn adjust_balance(&mut self, update: &BalanceUpdate) -> Result<u64, PersistenceError> {
        let row = self
            .users
            .get_mut(&update.account_id)
            .ok_or(PersistenceError::AccountNotFound(update.account_id))?;

        let balance = if update.delta >= 0 {
            row.balance.saturating_add(update.delta as u64)
        } else {
            let debit = update.delta.unsigned_abs();
            row.balance
                .checked_sub(debit)
                .ok_or(PersistenceError::Overdraft {
                    account_id: update.account_id,
                    debit,
                    balance: row.balance,
                })?
        };
        row.balance = balance;

        if let BalanceReason::Settlement {
            outcome,
            stake,
            multiplier,
            payout,
            ..
        } = update.reason
        {
            let id = self.next_game_id;
            self.next_game_id += 1;
            self.games.push(GameRecord {
                id,
                user_id: update.account_id,
                result: outcome,
                bet_amount: stake,
                multiplier,
                win_amount: payout,
                created_at: Utc::now(),
            });
        }

        Ok(balance)
    }

    fn history(&self, id: AccountId, limit: usize) -> Result<Vec<GameRecord>, PersistenceError> {
        if !self.users.contains_key(&id) {
            return Err(PersistenceError::AccountNotFound(id));
        }
        // Records are appended in creation order
        Ok(self
            .games
            .iter()
            .rev()
            .filter(|g| g.user_id == id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// In-process account store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountBackend for MemoryStore {
    fn authenticate(&self, username: &str) -> Result<Account, PersistenceError> {
        self.data.lock().authenticate(username).map(|(account, _)| account)
    }

    fn get_account(&self, id: AccountId) -> Result<Account, PersistenceError> {
        self.data.lock().get_account(id)
    }

    fn adjust_balance(&self, update: &BalanceUpdate) -> Result<u64, PersistenceError> {
        self.data.lock().adjust_balance(update)
    }

    fn history(&self, id: AccountId, limit: usize) -> Result<Vec<GameRecord>, PersistenceError> {
        self.data.lock().history(id, limit)
    }
}
