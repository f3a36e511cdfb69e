//! Error taxonomy
//!
//! Every failure is returned as a typed result; nothing here is raised
//! across a tick boundary.

use thiserror::Error;

use crate::AccountId;

/// Rejection reasons for a bet placement
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BetError {
    #[error("insufficient funds: stake {stake}, balance {balance}")]
    InsufficientFunds { stake: u64, balance: u64 },

    #[error("round locked: {0}")]
    RoundLocked(LockReason),

    #[error("radius {radius} outside [{min}, {max}]")]
    InvalidRadius { radius: f32, min: f32, max: f32 },

    #[error("target center ({x}, {y}) is outside the field")]
    InvalidPosition { x: f32, y: f32 },

    #[error("stake must be greater than zero")]
    InvalidStake,

    #[error("account {0} has not joined this engine")]
    UnknownAccount(AccountId),
}

/// Why a bet was rejected with [`BetError::RoundLocked`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// Not in the betting phase
    WrongPhase,
    /// Final seconds before launch
    LockWindow,
    /// A bet is already active for this round
    BetActive,
}

impl std::fmt::Display for LockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LockReason::WrongPhase => "betting is closed",
            LockReason::LockWindow => "lock window engaged",
            LockReason::BetActive => "a bet is already active",
        };
        f.write_str(s)
    }
}

/// Account service / store failures. Non-fatal for gameplay.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("account service unreachable: {0}")]
    Unreachable(String),

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("username must be at least 2 characters")]
    InvalidUsername,

    #[error("debit of {debit} exceeds stored balance {balance} for account {account_id}")]
    Overdraft {
        account_id: AccountId,
        debit: u64,
        balance: u64,
    },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Invalid game configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field} must be {requirement} (got {value})")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("lock window ({lock_ms} ms) must be shorter than the betting window ({betting_ms} ms)")]
    LockExceedsBetting { lock_ms: u64, betting_ms: u64 },

    #[error("distance budget range is empty: [{min}, {max}]")]
    EmptyDistanceRange { min: f32, max: f32 },
}
