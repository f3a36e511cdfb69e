//! Round history log
//!
//! Bounded, newest-first record of settled bets.

use serde::{Deserialize, Serialize};

use crate::AccountId;
use crate::consts::HISTORY_CAP;

/// Result of a settled bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
        }
    }
}

/// A single settled bet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundHistoryEntry {
    /// Round the bet was settled in
    pub round: u64,
    pub account_id: AccountId,
    pub outcome: Outcome,
    /// Full-precision multiplier the bet was placed at
    pub multiplier: f64,
    pub stake: u64,
    /// Amount credited (0 on a loss)
    pub payout: u64,
}

/// Recent outcomes log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundHistory {
    cap: usize,
    entries: Vec<RoundHistoryEntry>,
}

impl Default for RoundHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAP)
    }
}

impl RoundHistory {
    /// Create an empty log keeping at most `cap` entries
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            entries: Vec::with_capacity(cap.max(1) + 1),
        }
    }

    /// Record an entry as the newest, evicting the oldest past the cap
    pub fn push(&mut self, entry: RoundHistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(self.cap);
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[RoundHistoryEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&RoundHistoryEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of payouts minus stakes over the retained entries
    pub fn net(&self) -> i64 {
        self.entries
            .iter()
            .map(|e| e.payout as i64 - e.stake as i64)
            .sum()
    }
}
