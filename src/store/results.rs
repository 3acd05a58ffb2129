//! Append-only result log.
//!
//! One CSV row per terminal [`OutcomeRecord`], header written on creation.
//! A record is appended in a single write, so an interrupted run leaves the
//! log with whole rows only.

use crate::outcome::OutcomeRecord;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct ResultsLog {
    path: PathBuf,
    /// Serializes appends across domain workers.
    write_lock: Mutex<()>,
}

impl ResultsLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one record, creating the file (and header) on first use.
    pub fn append(&self, record: &OutcomeRecord) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open result log {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer
            .serialize(record)
            .context("failed to serialize outcome record")?;
        writer.flush().context("failed to flush result log")?;
        Ok(())
    }
}
