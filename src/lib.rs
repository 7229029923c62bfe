//! dealpay — wallet and ledger service for the venture dashboard.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod dashboard;
pub mod ledger;
pub mod storage;
pub mod types;
