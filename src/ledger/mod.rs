//! Core ledger — wallet store, transaction log, and the engine that moves
//! money between them atomically.

pub mod engine;
pub mod log;
pub mod wallets;

pub use engine::{CashOutcome, Ledger, LedgerSnapshot, TransferOutcome};
pub use log::TransactionLog;
pub use wallets::WalletStore;
