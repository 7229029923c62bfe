//! Shared types for the dealpay ledger.
//!
//! These types form the data model used across all modules: wallets,
//! transaction records, and the domain error enum. Balances and transaction
//! amounts are integer minor units (e.g. cents) end-to-end — decimal values
//! exist only at the HTTP boundary and are converted on the way in.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// Per-user record of available balance in a single currency.
///
/// Mutated only by the ledger engine; `balance` is never negative after a
/// completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: String,
    /// Balance in minor currency units (never floating point).
    pub balance: i64,
    /// ISO currency code, fixed per deployment.
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.user_id, self.balance, self.currency)
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Which kind of money movement a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Transfer,
    /// Debit leg of a deal funding (on the investor).
    Funding,
    /// Credit leg of a deal funding (on the entrepreneur).
    Receipt,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Funding => "funding",
            TransactionKind::Receipt => "receipt",
        };
        write!(f, "{s}")
    }
}

/// Settlement state of a transaction record.
///
/// Settlement is synchronous in this design, so records are only ever
/// observed `Completed`. The other states stay representable (and
/// filterable) for future asynchronous payment-network settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// One leg of a committed money movement.
///
/// Immutable once completed: only `status` may ever transition, never the
/// amount or the parties. Transfer and funding operations always create a
/// linked debit/credit pair whose signed amounts sum to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Monotonic id assigned by the transaction log. Doubles as insertion
    /// order for the log's ordering tie-break.
    pub id: u64,
    /// Whose ledger entry this is.
    pub user_id: String,
    pub kind: TransactionKind,
    /// Signed minor units: negative = outflow from `user_id`,
    /// positive = inflow.
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    /// Set on the credit leg of a two-party movement.
    pub sender_id: Option<String>,
    /// Set on the debit leg of a two-party movement.
    pub receiver_id: Option<String>,
    pub deal_id: Option<String>,
    pub deal_name: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Whether this record appears in the given user's history — as the
    /// entry owner, or as the counterparty of either leg.
    pub fn involves(&self, user_id: &str) -> bool {
        self.user_id == user_id
            || self.sender_id.as_deref() == Some(user_id)
            || self.receiver_id.as_deref() == Some(user_id)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "txn #{} [{}] {} {} {} ({})",
            self.id, self.kind, self.user_id, self.amount, self.currency, self.status,
        )
    }
}

/// A transaction awaiting id and timestamps from the log.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub deal_id: Option<String>,
    pub deal_name: Option<String>,
    pub description: String,
}

/// Reference to a deal being funded. The deal directory is external —
/// the ledger only records the id and display name on both legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealRef {
    pub deal_id: String,
    pub deal_name: String,
}

// ---------------------------------------------------------------------------
// Money conversion
// ---------------------------------------------------------------------------

/// Convert a decimal currency value from the API boundary into integer minor
/// units. Rejects non-positive values and values finer than the configured
/// minor-unit exponent (e.g. $1.005 with exponent 2).
pub fn to_minor_units(amount: Decimal, exponent: u32) -> Result<i64, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount.to_string()));
    }
    let scale = 10i64
        .checked_pow(exponent)
        .map(Decimal::from)
        .ok_or_else(|| LedgerError::InvalidAmount(amount.to_string()))?;
    let scaled = amount
        .checked_mul(scale)
        .ok_or_else(|| LedgerError::InvalidAmount(amount.to_string()))?;
    if !scaled.fract().is_zero() {
        return Err(LedgerError::InvalidAmount(amount.to_string()));
    }
    scaled
        .to_i64()
        .ok_or_else(|| LedgerError::InvalidAmount(amount.to_string()))
}

/// Convert minor units back to a decimal value for presentation.
pub fn from_minor_units(amount: i64, exponent: u32) -> Decimal {
    Decimal::new(amount, exponent)
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain errors for the ledger. All four are rejected before any mutation:
/// the caller is informed synchronously and state is left exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("No wallet for user {0}")]
    UserNotFound(String),

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("Sender and receiver are the same account ({0})")]
    SameAccount(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
