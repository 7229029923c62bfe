//! Persistence layer.
//!
//! Saves and loads the full ledger state (wallets + transaction log) to a
//! JSON snapshot. A database can replace this later without touching the
//! engine; JSON is sufficient for the single-node dashboard deployment.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::ledger::LedgerSnapshot;

/// Default snapshot file path.
const DEFAULT_SNAPSHOT_FILE: &str = "dealpay_ledger.json";

/// Save a ledger snapshot to a JSON file.
pub fn save_snapshot(snapshot: &LedgerSnapshot, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_SNAPSHOT_FILE);
    let json = serde_json::to_string_pretty(snapshot)
        .context("Failed to serialise ledger snapshot")?;

    std::fs::write(path, &json)
        .context(format!("Failed to write snapshot to {path}"))?;

    debug!(
        path,
        wallets = snapshot.wallets.len(),
        transactions = snapshot.transactions.len(),
        "Snapshot saved"
    );
    Ok(())
}

/// Load a ledger snapshot from a JSON file.
/// Returns None if the file doesn't exist (fresh start).
pub fn load_snapshot(path: Option<&str>) -> Result<Option<LedgerSnapshot>> {
    let path = path.unwrap_or(DEFAULT_SNAPSHOT_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved snapshot found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read snapshot from {path}"))?;

    let snapshot: LedgerSnapshot = serde_json::from_str(&json)
        .context(format!("Failed to parse snapshot from {path}"))?;

    info!(
        path,
        wallets = snapshot.wallets.len(),
        transactions = snapshot.transactions.len(),
        "Snapshot loaded from disk"
    );

    Ok(Some(snapshot))
}

/// Delete the snapshot file (for testing or reset).
pub fn delete_snapshot(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_SNAPSHOT_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to delete snapshot file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;

    fn temp_path() -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("dealpay_test_snapshot_{}.json", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path();
        let ledger = Ledger::new("USD");
        ledger.open_wallet("i1", 5_000_000);
        ledger.open_wallet("e1", 150_000);
        ledger.transfer("i1", "e1", 1_000_000, None).unwrap();

        save_snapshot(&ledger.snapshot(), Some(&path)).unwrap();

        let loaded = load_snapshot(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.currency, "USD");
        assert_eq!(loaded.wallets.len(), 2);
        assert_eq!(loaded.transactions.len(), 2);

        let restored = Ledger::from_snapshot(loaded);
        assert_eq!(restored.wallet("i1").unwrap().balance, 4_000_000);
        assert_eq!(restored.wallet("e1").unwrap().balance, 1_150_000);

        delete_snapshot(Some(&path)).unwrap();
    }

    #[test]
    fn test_load_nonexistent() {
        let loaded = load_snapshot(Some("/tmp/dealpay_nonexistent_snapshot_12345.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_delete_snapshot() {
        let path = temp_path();
        save_snapshot(&Ledger::new("USD").snapshot(), Some(&path)).unwrap();
        assert!(Path::new(&path).exists());

        delete_snapshot(Some(&path)).unwrap();
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn test_delete_nonexistent_ok() {
        let result = delete_snapshot(Some("/tmp/dealpay_does_not_exist_xyz.json"));
        assert!(result.is_ok());
    }
}
