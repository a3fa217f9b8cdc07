use std::{
    collections::HashSet,
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, warn};

use super::Ledger;
use crate::{
    error::Result,
    types::{LedgerEntry, NotificationKey},
};

/// Columns holding the key fields, in file order. Rows are read by position
/// so ledgers written under other header names (`nr_masina,tip,...`) still load.
const KEY_COLUMNS: [usize; 4] = [1, 2, 3, 4];

/// On-disk row layout. The header is written once, when the file is created.
#[derive(Debug, Serialize)]
struct LedgerRow {
    sent_at: String,
    vehicle_id: String,
    document: String,
    expires_on: String,
    days_left: String,
    destination: String,
}

impl From<&LedgerEntry> for LedgerRow {
    fn from(e: &LedgerEntry) -> Self {
        Self {
            sent_at: e.sent_at.clone(),
            vehicle_id: e.key.vehicle.clone(),
            document: e.key.document.clone(),
            expires_on: e.key.expires_on.clone(),
            days_left: e.key.days_left.clone(),
            destination: e.destination.clone(),
        }
    }
}

/// Ledger kept as a flat CSV file, e.g. `sent_log.csv`.
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Ledger for CsvLedger {
    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn load(&mut self) -> Result<HashSet<NotificationKey>> {
        let mut keys = HashSet::new();
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no ledger file yet");
            return Ok(keys);
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        for (line, row) in reader.records().enumerate() {
            // header is line 1
            let line = line + 2;
            let record = match row {
                Ok(r) => r,
                Err(e) => {
                    warn!(path = %self.path.display(), line, "unreadable ledger row skipped: {e}");
                    continue;
                }
            };
            match KEY_COLUMNS.map(|i| record.get(i)) {
                [Some(vehicle), Some(document), Some(expires_on), Some(days_left)] => {
                    keys.insert(NotificationKey::new(vehicle, document, expires_on, days_left));
                }
                _ => warn!(path = %self.path.display(), line, "short ledger row skipped"),
            }
        }
        Ok(keys)
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<()> {
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(LedgerRow::from(entry))?;
        writer.flush()?;
        Ok(())
    }
}
