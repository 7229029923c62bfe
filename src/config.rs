//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs:
//! currency settings, snapshot location, seed wallets, and the server port.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// ISO currency code. Single currency per deployment.
    pub currency: String,
    /// Minor-unit scale for the currency (2 for USD cents).
    pub currency_exponent: u32,
    /// Where the JSON ledger snapshot lives.
    pub snapshot_path: String,
    /// Wallets created on a fresh start (balances in minor units).
    #[serde(default)]
    pub seed_wallets: Vec<SeedWallet>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedWallet {
    pub user_id: String,
    pub balance: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
