//! dealpay — wallet and ledger service for the venture dashboard.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the ledger from its snapshot (or seeds a fresh one from config),
//! and serves the dashboard API with graceful shutdown.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use dealpay::config;
use dealpay::dashboard;
use dealpay::dashboard::routes::ApiContext;
use dealpay::ledger::Ledger;
use dealpay::storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    info!(
        currency = %cfg.ledger.currency,
        port = cfg.server.port,
        snapshot_path = %cfg.ledger.snapshot_path,
        "dealpay starting up"
    );

    // -- Restore or seed the ledger --------------------------------------

    let ledger = match storage::load_snapshot(Some(&cfg.ledger.snapshot_path))? {
        Some(snapshot) => {
            info!(
                wallets = snapshot.wallets.len(),
                transactions = snapshot.transactions.len(),
                "Resumed ledger from snapshot"
            );
            Ledger::from_snapshot(snapshot)
        }
        None => {
            let ledger = Ledger::new(&cfg.ledger.currency);
            for seed in &cfg.ledger.seed_wallets {
                ledger.open_wallet(&seed.user_id, seed.balance);
            }
            info!(
                wallets = cfg.ledger.seed_wallets.len(),
                "Fresh ledger seeded from config"
            );
            ledger
        }
    };

    // -- Serve the dashboard API -----------------------------------------

    let state = Arc::new(ApiContext::new(
        ledger,
        cfg.ledger.currency_exponent,
        Some(cfg.ledger.snapshot_path.clone()),
    ));
    let app = dashboard::build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(port = cfg.server.port, "Listening on http://localhost:{}", cfg.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Save final state
    storage::save_snapshot(&state.ledger.snapshot(), Some(&cfg.ledger.snapshot_path))?;
    info!(
        total_balance = state.ledger.total_balance(),
        "dealpay shut down cleanly."
    );

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received.");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dealpay=info"));

    let json_logging = std::env::var("DEALPAY_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
