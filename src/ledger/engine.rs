//! Ledger engine — deposits, withdrawals, transfers, and deal funding.
//!
//! All four operations are thin wrappers over one internal primitive,
//! `move_funds`: validate preconditions, mutate one or two balances, append
//! one or two linked records. `from = None` models an external deposit
//! source and `to = None` an external withdrawal sink, so the double-entry
//! invariant for two-party movements holds structurally.
//!
//! The wallet store and transaction log live behind a single mutex: every
//! operation — balance check, mutations, appends — is one indivisible
//! critical section, and log ids are assigned in commit order under the
//! lock. No I/O or unbounded work happens while it is held.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::ledger::log::TransactionLog;
use crate::ledger::wallets::WalletStore;
use crate::types::{
    DealRef, LedgerError, Transaction, TransactionDraft, TransactionKind, TransactionStatus,
    Wallet,
};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a deposit or withdrawal: the appended record and the wallet
/// as of the commit.
#[derive(Debug, Clone)]
pub struct CashOutcome {
    pub transaction: Transaction,
    pub wallet: Wallet,
}

/// Result of a transfer or deal funding: both legs and both wallets as of
/// the commit. The legs cross-reference each other and sum to zero.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// Debit leg, on the sender/investor.
    pub debit: Transaction,
    /// Credit leg, on the receiver/entrepreneur.
    pub credit: Transaction,
    pub sender_wallet: Wallet,
    pub receiver_wallet: Wallet,
}

/// Serializable image of the full ledger state, for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub currency: String,
    pub wallets: Vec<Wallet>,
    pub transactions: Vec<Transaction>,
}

// ---------------------------------------------------------------------------
// Internal move specification
// ---------------------------------------------------------------------------

/// Everything `move_funds` needs to commit one movement.
struct MoveSpec<'a> {
    /// Debited wallet; `None` for an external deposit.
    from: Option<&'a str>,
    /// Credited wallet; `None` for an external withdrawal.
    to: Option<&'a str>,
    /// Magnitude in minor units; must be positive.
    amount: i64,
    debit_kind: TransactionKind,
    credit_kind: TransactionKind,
    deal: Option<DealRef>,
    debit_description: String,
    credit_description: String,
}

struct LedgerState {
    wallets: WalletStore,
    log: TransactionLog,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The ledger engine. Cheap to share behind an `Arc`; safe under concurrent
/// invocation from any number of callers.
pub struct Ledger {
    state: Mutex<LedgerState>,
    currency: String,
}

impl Ledger {
    pub fn new(currency: &str) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                wallets: WalletStore::new(),
                log: TransactionLog::new(),
            }),
            currency: currency.to_string(),
        }
    }

    /// Restore a ledger from a saved snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                wallets: WalletStore::from_wallets(snapshot.wallets),
                log: TransactionLog::from_entries(snapshot.transactions),
            }),
            currency: snapshot.currency,
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Seed a wallet with an initial balance (no transaction record —
    /// registration happens outside the ledger). No-op if it exists.
    pub fn open_wallet(&self, user_id: &str, initial_balance: i64) {
        let mut state = self.lock();
        state.wallets.open(user_id, initial_balance, &self.currency);
    }

    // -- Reads -----------------------------------------------------------

    pub fn wallet(&self, user_id: &str) -> Option<Wallet> {
        self.lock().wallets.get(user_id).cloned()
    }

    /// Newest-first history for a user: records where they are the entry
    /// owner, the sender, or the receiver.
    pub fn transactions(
        &self,
        user_id: &str,
        status: Option<TransactionStatus>,
    ) -> Vec<Transaction> {
        self.lock().log.list_for(user_id, status)
    }

    /// Sum of all wallet balances. Only deposits and withdrawals may change
    /// this; transfers and deal funding conserve it.
    pub fn total_balance(&self) -> i64 {
        self.lock().wallets.total_balance()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.lock();
        LedgerSnapshot {
            currency: self.currency.clone(),
            wallets: state.wallets.all(),
            transactions: state.log.all(),
        }
    }

    // -- Operations ------------------------------------------------------

    /// Credit a wallet from an external source.
    pub fn deposit(
        &self,
        user_id: &str,
        amount: i64,
        description: Option<&str>,
    ) -> Result<CashOutcome, LedgerError> {
        let (_, credit, _, wallet) = self.move_funds(MoveSpec {
            from: None,
            to: Some(user_id),
            amount,
            debit_kind: TransactionKind::Deposit,
            credit_kind: TransactionKind::Deposit,
            deal: None,
            debit_description: String::new(),
            credit_description: description.unwrap_or("Deposit").to_string(),
        })?;
        match (credit, wallet) {
            (Some(transaction), Some(wallet)) => Ok(CashOutcome { transaction, wallet }),
            _ => unreachable!("deposit committed without a credit leg"),
        }
    }

    /// Debit a wallet to an external sink. All-or-nothing: fails with
    /// `InsufficientFunds` rather than allowing a partial withdrawal.
    pub fn withdraw(
        &self,
        user_id: &str,
        amount: i64,
        description: Option<&str>,
    ) -> Result<CashOutcome, LedgerError> {
        let (debit, _, wallet, _) = self.move_funds(MoveSpec {
            from: Some(user_id),
            to: None,
            amount,
            debit_kind: TransactionKind::Withdraw,
            credit_kind: TransactionKind::Withdraw,
            deal: None,
            debit_description: description.unwrap_or("Withdrawal").to_string(),
            credit_description: String::new(),
        })?;
        match (debit, wallet) {
            (Some(transaction), Some(wallet)) => Ok(CashOutcome { transaction, wallet }),
            _ => unreachable!("withdrawal committed without a debit leg"),
        }
    }

    /// Move funds between two wallets, recording a linked debit/credit pair.
    pub fn transfer(
        &self,
        sender_id: &str,
        receiver_id: &str,
        amount: i64,
        description: Option<&str>,
    ) -> Result<TransferOutcome, LedgerError> {
        self.move_pair(MoveSpec {
            from: Some(sender_id),
            to: Some(receiver_id),
            amount,
            debit_kind: TransactionKind::Transfer,
            credit_kind: TransactionKind::Transfer,
            deal: None,
            debit_description: description.unwrap_or("Transfer").to_string(),
            // The caller's description rides on both legs; the fallback
            // alone distinguishes the credit side.
            credit_description: description.unwrap_or("Transfer received").to_string(),
        })
    }

    /// Fund a deal: transfer mechanics with the legs tagged `funding`
    /// (investor debit) and `receipt` (entrepreneur credit), both carrying
    /// the deal reference.
    pub fn fund_deal(
        &self,
        investor_id: &str,
        entrepreneur_id: &str,
        deal_id: &str,
        deal_name: &str,
        amount: i64,
    ) -> Result<TransferOutcome, LedgerError> {
        self.move_pair(MoveSpec {
            from: Some(investor_id),
            to: Some(entrepreneur_id),
            amount,
            debit_kind: TransactionKind::Funding,
            credit_kind: TransactionKind::Receipt,
            deal: Some(DealRef {
                deal_id: deal_id.to_string(),
                deal_name: deal_name.to_string(),
            }),
            debit_description: format!("Funding for {deal_name}"),
            credit_description: format!("Investment received for {deal_name}"),
        })
    }

    // -- Internals -------------------------------------------------------

    fn move_pair(&self, spec: MoveSpec) -> Result<TransferOutcome, LedgerError> {
        let (debit, credit, sender_wallet, receiver_wallet) = self.move_funds(spec)?;
        match (debit, credit, sender_wallet, receiver_wallet) {
            (Some(debit), Some(credit), Some(sender_wallet), Some(receiver_wallet)) => {
                Ok(TransferOutcome {
                    debit,
                    credit,
                    sender_wallet,
                    receiver_wallet,
                })
            }
            _ => unreachable!("two-party movement committed without both legs"),
        }
    }

    /// The single primitive behind all four operations.
    ///
    /// Validation happens entirely before any mutation; once mutation
    /// starts, nothing inside can fail. A wallet disappearing between
    /// validation and mutation would mean the critical section was broken,
    /// which is fatal by design.
    #[allow(clippy::type_complexity)]
    fn move_funds(
        &self,
        spec: MoveSpec,
    ) -> Result<
        (
            Option<Transaction>,
            Option<Transaction>,
            Option<Wallet>,
            Option<Wallet>,
        ),
        LedgerError,
    > {
        let mut state = self.lock();

        // Validate everything up front — no partial application.
        if spec.amount <= 0 {
            return Err(LedgerError::InvalidAmount(spec.amount.to_string()));
        }
        if let (Some(from), Some(to)) = (spec.from, spec.to) {
            if from == to {
                return Err(LedgerError::SameAccount(from.to_string()));
            }
        }
        for party in [spec.from, spec.to].into_iter().flatten() {
            if !state.wallets.contains(party) {
                return Err(LedgerError::UserNotFound(party.to_string()));
            }
        }
        if let Some(to) = spec.to {
            let balance = state.wallets.get(to).map(|w| w.balance).unwrap_or_default();
            // The credit must not overflow the receiver's balance; rejecting
            // here keeps `adjust` validation-free and the wallet non-negative.
            if balance.checked_add(spec.amount).is_none() {
                return Err(LedgerError::InvalidAmount(spec.amount.to_string()));
            }
        }
        if let Some(from) = spec.from {
            let available = state
                .wallets
                .get(from)
                .map(|w| w.balance)
                .unwrap_or_default();
            if available < spec.amount {
                debug!(
                    user_id = from,
                    needed = spec.amount,
                    available,
                    "Rejected: insufficient funds"
                );
                return Err(LedgerError::InsufficientFunds {
                    needed: spec.amount,
                    available,
                });
            }
        }

        // Commit. Both balances move and both legs append under one lock.
        let from_wallet = spec.from.map(|from| {
            state
                .wallets
                .adjust(from, -spec.amount)
                .unwrap_or_else(|| panic!("wallet {from} vanished mid-operation"))
                .clone()
        });
        let to_wallet = spec.to.map(|to| {
            state
                .wallets
                .adjust(to, spec.amount)
                .unwrap_or_else(|| panic!("wallet {to} vanished mid-operation"))
                .clone()
        });

        let (deal_id, deal_name) = match spec.deal {
            Some(deal) => (Some(deal.deal_id), Some(deal.deal_name)),
            None => (None, None),
        };

        let debit = spec.from.map(|from| {
            state.log.append(TransactionDraft {
                user_id: from.to_string(),
                kind: spec.debit_kind,
                amount: -spec.amount,
                currency: self.currency.clone(),
                status: TransactionStatus::Completed,
                sender_id: None,
                receiver_id: spec.to.map(str::to_string),
                deal_id: deal_id.clone(),
                deal_name: deal_name.clone(),
                description: spec.debit_description,
            })
        });
        let credit = spec.to.map(|to| {
            state.log.append(TransactionDraft {
                user_id: to.to_string(),
                kind: spec.credit_kind,
                amount: spec.amount,
                currency: self.currency.clone(),
                status: TransactionStatus::Completed,
                sender_id: spec.from.map(str::to_string),
                receiver_id: None,
                deal_id,
                deal_name,
                description: spec.credit_description,
            })
        });

        info!(
            from = spec.from.unwrap_or("external"),
            to = spec.to.unwrap_or("external"),
            amount = spec.amount,
            kind = %spec.debit_kind,
            "Movement committed"
        );

        Ok((debit, credit, from_wallet, to_wallet))
    }

    /// A poisoned lock means a panic happened inside the critical section —
    /// the atomicity guarantee is already gone, so refuse to continue.
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().expect("ledger state poisoned")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Ledger seeded with the dashboard's stock accounts: three investors,
    /// three entrepreneurs.
    fn seeded() -> Ledger {
        let ledger = Ledger::new("USD");
        ledger.open_wallet("i1", 5_000_000);
        ledger.open_wallet("i2", 3_000_000);
        ledger.open_wallet("i3", 8_000_000);
        ledger.open_wallet("e1", 150_000);
        ledger.open_wallet("e2", 200_000);
        ledger.open_wallet("e3", 80_000);
        ledger
    }

    #[test]
    fn test_deposit_credits_and_logs() {
        let ledger = seeded();
        let outcome = ledger.deposit("i1", 1_000_000, Some("Bank transfer")).unwrap();

        assert_eq!(outcome.wallet.balance, 6_000_000);
        assert_eq!(outcome.transaction.kind, TransactionKind::Deposit);
        assert_eq!(outcome.transaction.amount, 1_000_000);
        assert_eq!(outcome.transaction.status, TransactionStatus::Completed);
        assert_eq!(outcome.transaction.description, "Bank transfer");
        assert_eq!(ledger.transactions("i1", None).len(), 1);
    }

    #[test]
    fn test_deposit_rejects_non_positive_amount() {
        let ledger = seeded();
        assert!(matches!(
            ledger.deposit("i1", -10, None),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.deposit("i1", 0, None),
            Err(LedgerError::InvalidAmount(_))
        ));
        // No state change.
        assert_eq!(ledger.wallet("i1").unwrap().balance, 5_000_000);
        assert!(ledger.transactions("i1", None).is_empty());
    }

    #[test]
    fn test_deposit_overflowing_balance_rejected() {
        let ledger = Ledger::new("USD");
        ledger.open_wallet("i1", 1);

        let err = ledger.deposit("i1", i64::MAX, None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        // No state change: balance intact, nothing logged, never negative.
        assert_eq!(ledger.wallet("i1").unwrap().balance, 1);
        assert!(ledger.transactions("i1", None).is_empty());
    }

    #[test]
    fn test_transfer_overflowing_receiver_rejected() {
        let ledger = Ledger::new("USD");
        ledger.open_wallet("i1", i64::MAX);
        ledger.open_wallet("e1", i64::MAX - 10);

        let err = ledger.transfer("i1", "e1", 100, None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(ledger.wallet("i1").unwrap().balance, i64::MAX);
        assert_eq!(ledger.wallet("e1").unwrap().balance, i64::MAX - 10);

        // Room for exactly 10 more.
        ledger.transfer("i1", "e1", 10, None).unwrap();
        assert_eq!(ledger.wallet("e1").unwrap().balance, i64::MAX);
    }

    #[test]
    fn test_deposit_unknown_user() {
        let ledger = seeded();
        assert!(matches!(
            ledger.deposit("ghost", 100, None),
            Err(LedgerError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_withdraw_debits_and_logs() {
        let ledger = seeded();
        let outcome = ledger.withdraw("i1", 500_000, None).unwrap();

        assert_eq!(outcome.wallet.balance, 4_500_000);
        assert_eq!(outcome.transaction.kind, TransactionKind::Withdraw);
        assert_eq!(outcome.transaction.amount, -500_000);
        assert_eq!(outcome.transaction.description, "Withdrawal");
    }

    #[test]
    fn test_withdraw_insufficient_funds_is_all_or_nothing() {
        let ledger = seeded();
        let err = ledger.withdraw("i1", 6_000_000, None).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                needed: 6_000_000,
                available: 5_000_000,
            }
        ));
        assert_eq!(ledger.wallet("i1").unwrap().balance, 5_000_000);
        assert!(ledger.transactions("i1", None).is_empty());
    }

    #[test]
    fn test_transfer_moves_funds_with_double_entry() {
        let ledger = seeded();
        let total_before = ledger.total_balance();

        let outcome = ledger.transfer("i1", "e1", 1_000_000, Some("loan")).unwrap();

        assert_eq!(outcome.sender_wallet.balance, 4_000_000);
        assert_eq!(outcome.receiver_wallet.balance, 1_150_000);

        // Double entry: two legs, cross-referenced, summing to zero.
        assert_eq!(outcome.debit.amount, -1_000_000);
        assert_eq!(outcome.credit.amount, 1_000_000);
        assert_eq!(outcome.debit.amount + outcome.credit.amount, 0);
        assert_eq!(outcome.debit.kind, TransactionKind::Transfer);
        assert_eq!(outcome.credit.kind, TransactionKind::Transfer);
        assert_eq!(outcome.debit.receiver_id.as_deref(), Some("e1"));
        assert_eq!(outcome.credit.sender_id.as_deref(), Some("i1"));
        // The caller's description appears verbatim on both legs.
        assert_eq!(outcome.debit.description, "loan");
        assert_eq!(outcome.credit.description, "loan");

        // Conservation.
        assert_eq!(ledger.total_balance(), total_before);
    }

    #[test]
    fn test_transfer_failure_leaves_no_trace() {
        let ledger = seeded();
        let err = ledger.transfer("e3", "i1", 100_000, None).unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(ledger.wallet("e3").unwrap().balance, 80_000);
        assert_eq!(ledger.wallet("i1").unwrap().balance, 5_000_000);
        assert!(ledger.transactions("e3", None).is_empty());
        assert!(ledger.transactions("i1", None).is_empty());
    }

    #[test]
    fn test_transfer_default_descriptions() {
        let ledger = seeded();
        let outcome = ledger.transfer("i1", "e1", 100, None).unwrap();
        assert_eq!(outcome.debit.description, "Transfer");
        assert_eq!(outcome.credit.description, "Transfer received");
    }

    #[test]
    fn test_transfer_same_account() {
        let ledger = seeded();
        assert!(matches!(
            ledger.transfer("i1", "i1", 100, None),
            Err(LedgerError::SameAccount(_))
        ));
        assert_eq!(ledger.wallet("i1").unwrap().balance, 5_000_000);
    }

    #[test]
    fn test_transfer_unknown_parties() {
        let ledger = seeded();
        assert!(matches!(
            ledger.transfer("ghost", "e1", 100, None),
            Err(LedgerError::UserNotFound(_))
        ));
        assert!(matches!(
            ledger.transfer("i1", "ghost", 100, None),
            Err(LedgerError::UserNotFound(_))
        ));
        assert_eq!(ledger.wallet("i1").unwrap().balance, 5_000_000);
    }

    #[test]
    fn test_fund_deal_tags_both_legs() {
        let ledger = seeded();
        ledger.transfer("i1", "e1", 1_000_000, None).unwrap();

        let outcome = ledger
            .fund_deal("i1", "e1", "deal-9", "Acme", 500_000)
            .unwrap();

        assert_eq!(outcome.sender_wallet.balance, 3_500_000);
        assert_eq!(outcome.receiver_wallet.balance, 1_650_000);
        assert_eq!(outcome.debit.kind, TransactionKind::Funding);
        assert_eq!(outcome.credit.kind, TransactionKind::Receipt);
        assert_eq!(outcome.debit.deal_id.as_deref(), Some("deal-9"));
        assert_eq!(outcome.credit.deal_id.as_deref(), Some("deal-9"));
        assert_eq!(outcome.debit.deal_name.as_deref(), Some("Acme"));
        assert_eq!(outcome.debit.description, "Funding for Acme");
        assert_eq!(outcome.credit.description, "Investment received for Acme");
    }

    #[test]
    fn test_fund_deal_shares_transfer_failure_modes() {
        let ledger = seeded();
        assert!(matches!(
            ledger.fund_deal("e3", "e1", "deal-1", "Acme", 100_000),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            ledger.fund_deal("i1", "i1", "deal-1", "Acme", 100),
            Err(LedgerError::SameAccount(_))
        ));
        assert!(matches!(
            ledger.fund_deal("i1", "ghost", "deal-1", "Acme", 100),
            Err(LedgerError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_history_is_newest_first_and_covers_both_parties() {
        let ledger = seeded();
        ledger.deposit("i1", 100, None).unwrap();
        ledger.transfer("i1", "e1", 50, None).unwrap();

        let i1 = ledger.transactions("i1", None);
        assert_eq!(i1.len(), 3); // deposit + both transfer legs
        assert_eq!(i1[0].kind, TransactionKind::Transfer);
        assert_eq!(i1[0].amount, 50); // credit leg appended last
        assert_eq!(i1[2].kind, TransactionKind::Deposit);

        let e1 = ledger.transactions("e1", None);
        assert_eq!(e1.len(), 2); // both legs name e1
    }

    #[test]
    fn test_reads_are_idempotent() {
        let ledger = seeded();
        ledger.transfer("i1", "e1", 500, None).unwrap();

        assert_eq!(ledger.wallet("i1"), ledger.wallet("i1"));
        assert_eq!(
            ledger.transactions("i1", None),
            ledger.transactions("i1", None)
        );
    }

    #[test]
    fn test_exact_withdrawal_empties_wallet() {
        let ledger = seeded();
        let outcome = ledger.withdraw("e3", 80_000, None).unwrap();
        assert_eq!(outcome.wallet.balance, 0);
        // Balance is exactly zero, never negative.
        assert!(ledger.withdraw("e3", 1, None).is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let ledger = seeded();
        ledger.deposit("i1", 100, None).unwrap();
        ledger.fund_deal("i1", "e1", "deal-1", "Acme", 50).unwrap();

        let restored = Ledger::from_snapshot(ledger.snapshot());
        assert_eq!(restored.currency(), "USD");
        assert_eq!(restored.total_balance(), ledger.total_balance());
        assert_eq!(
            restored.transactions("i1", None),
            ledger.transactions("i1", None)
        );

        // Ids keep climbing after a restore rather than colliding.
        let next = restored.deposit("i2", 10, None).unwrap();
        assert!(next.transaction.id > 3);
    }
}
