//! Append-only suppression store — addresses never to contact again.
//!
//! Entries come from manual operator action (`formscout suppress`) or from
//! the orchestrator on a hard bounce. The engine never mutates or deletes
//! entries. The in-memory set is shared across domain workers; appends are
//! atomic per entry and visible to every decision made after them in the
//! same run.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

/// One suppressed address. Rows are never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionEntry {
    pub email: String,
    pub reason: String,
    pub date_added: String,
}

pub struct SuppressionStore {
    path: PathBuf,
    /// Normalized (lowercase) addresses, including rows loaded at startup.
    entries: Mutex<HashSet<String>>,
}

impl SuppressionStore {
    /// Load existing entries; a missing file is an empty store.
    pub fn load(path: PathBuf) -> Result<Self> {
        let mut entries = HashSet::new();
        if path.exists() {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .comment(Some(b'#'))
                .trim(csv::Trim::All)
                .from_path(&path)
                .with_context(|| format!("failed to open suppression list {}", path.display()))?;
            for row in reader.deserialize::<SuppressionEntry>() {
                let entry =
                    row.with_context(|| format!("malformed row in {}", path.display()))?;
                entries.insert(entry.email.to_lowercase());
            }
        }
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn contains(&self, email: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&email.to_lowercase())
    }

    /// Read-only view for the decision engine.
    pub fn snapshot(&self) -> HashSet<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Append one entry, creating the file (and header) on first use.
    /// Holding the lock across the file write makes the append atomic per
    /// entry; duplicates are dropped silently.
    pub fn append(&self, email: &str, reason: &str) -> Result<()> {
        let normalized = email.to_lowercase();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.insert(normalized.clone()) {
            return Ok(());
        }

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| {
                format!("failed to open suppression list {}", self.path.display())
            })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer
            .serialize(SuppressionEntry {
                email: normalized.clone(),
                reason: reason.to_string(),
                date_added: Utc::now().to_rfc3339(),
            })
            .context("failed to serialize suppression entry")?;
        writer.flush().context("failed to flush suppression list")?;

        info!(email = normalized, reason, "address suppressed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suppression.csv");

        let store = SuppressionStore::load(path.clone()).unwrap();
        assert!(!store.contains("bad@site.com"));
        store.append("Bad@Site.com", "Hard bounce from SMTP").unwrap();
        assert!(store.contains("bad@site.com"));

        let reloaded = SuppressionStore::load(path).unwrap();
        assert!(reloaded.contains("BAD@SITE.COM"));
    }

    #[test]
    fn duplicate_appends_write_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suppression.csv");
        let store = SuppressionStore::load(path.clone()).unwrap();
        store.append("a@b.com", "manual").unwrap();
        store.append("A@B.com", "manual").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        // Header plus exactly one row.
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn snapshot_reflects_later_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = SuppressionStore::load(dir.path().join("s.csv")).unwrap();
        let before = store.snapshot();
        store.append("late@site.com", "Hard bounce from SMTP").unwrap();
        let after = store.snapshot();
        assert!(!before.contains("late@site.com"));
        assert!(after.contains("late@site.com"));
    }
}
