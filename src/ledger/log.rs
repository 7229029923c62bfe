//! Append-only transaction log.
//!
//! Owns the id counter: ids are monotonic and assigned at append time, so
//! insertion order is recoverable from ids alone. (The original dashboard
//! derived ids from the wall clock, which collides when two legs of one
//! transfer land inside the same millisecond.)

use chrono::Utc;

use crate::types::{Transaction, TransactionDraft, TransactionStatus};

/// Ordered record of every balance-affecting event. Records are never
/// deleted — this is the audit trail.
#[derive(Debug, Default)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
    next_id: u64,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a log from snapshot records. `next_id` resumes past the
    /// highest stored id.
    pub fn from_entries(entries: Vec<Transaction>) -> Self {
        let next_id = entries.iter().map(|t| t.id).max().map_or(1, |id| id + 1);
        Self { entries, next_id }
    }

    /// Assign the next id and timestamps, store the record, and return it.
    pub fn append(&mut self, draft: TransactionDraft) -> Transaction {
        let now = Utc::now();
        let txn = Transaction {
            id: self.next_id,
            user_id: draft.user_id,
            kind: draft.kind,
            amount: draft.amount,
            currency: draft.currency,
            status: draft.status,
            sender_id: draft.sender_id,
            receiver_id: draft.receiver_id,
            deal_id: draft.deal_id,
            deal_name: draft.deal_name,
            description: draft.description,
            created_at: now,
            updated_at: now,
        };
        self.next_id += 1;
        self.entries.push(txn.clone());
        txn
    }

    /// All records involving a user (as owner, sender, or receiver), newest
    /// first: `created_at` descending, tie-broken by id descending so the
    /// most recent append wins within one timestamp resolution.
    pub fn list_for(
        &self,
        user_id: &str,
        status: Option<TransactionStatus>,
    ) -> Vec<Transaction> {
        let mut matches: Vec<_> = self
            .entries
            .iter()
            .filter(|t| t.involves(user_id))
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matches
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the full log in insertion order.
    pub fn all(&self) -> Vec<Transaction> {
        self.entries.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
