//! Wallet store — one balance record per user.
//!
//! `adjust` is the only mutator and performs no sufficiency validation;
//! that is the engine's responsibility, enforced before `adjust` is called.

use chrono::Utc;
use std::collections::HashMap;

use crate::types::Wallet;

/// In-memory map of wallets keyed by user id. Wallets are seeded at startup
/// (registration lives outside the ledger) and never deleted.
#[derive(Debug, Default)]
pub struct WalletStore {
    wallets: HashMap<String, Wallet>,
}

impl WalletStore {
    pub fn new() -> Self {
        Self {
            wallets: HashMap::new(),
        }
    }

    /// Rebuild a store from snapshot records.
    pub fn from_wallets(wallets: Vec<Wallet>) -> Self {
        Self {
            wallets: wallets
                .into_iter()
                .map(|w| (w.user_id.clone(), w))
                .collect(),
        }
    }

    /// Seed a wallet. If the user already has one, it is left untouched.
    pub fn open(&mut self, user_id: &str, initial_balance: i64, currency: &str) -> &Wallet {
        self.wallets
            .entry(user_id.to_string())
            .or_insert_with(|| Wallet {
                user_id: user_id.to_string(),
                balance: initial_balance,
                currency: currency.to_string(),
                updated_at: Utc::now(),
            })
    }

    pub fn get(&self, user_id: &str) -> Option<&Wallet> {
        self.wallets.get(user_id)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.wallets.contains_key(user_id)
    }

    /// Apply a signed delta to a wallet's balance and refresh `updated_at`.
    /// Returns `None` if no wallet exists for the user.
    pub fn adjust(&mut self, user_id: &str, delta: i64) -> Option<&Wallet> {
        let wallet = self.wallets.get_mut(user_id)?;
        wallet.balance += delta;
        wallet.updated_at = Utc::now();
        Some(wallet)
    }

    /// Sum of all balances — deposits and withdrawals are the only
    /// operations allowed to change this total.
    pub fn total_balance(&self) -> i64 {
        self.wallets.values().map(|w| w.balance).sum()
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /// Snapshot of all wallets, ordered by user id for stable output.
    pub fn all(&self) -> Vec<Wallet> {
        let mut all: Vec<_> = self.wallets.values().cloned().collect();
        all.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        all
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
