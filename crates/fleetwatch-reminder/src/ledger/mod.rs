//! Sent-notification ledger.
//!
//! The ledger is an append-only record of every notification that reached
//! the relay. It is advisory: losing it causes re-sends, never a crash.
//! One writer at a time is assumed; overlapping runs against the same
//! ledger are not supported.

mod csv_file;
mod sqlite;

use std::collections::HashSet;

use fleetwatch_core::config::{LedgerBackend, LedgerConfig};
use tracing::info;

pub use csv_file::CsvLedger;
pub use sqlite::{init_db, SqliteLedger};

use crate::{
    error::Result,
    types::{LedgerEntry, NotificationKey},
};

/// Persistent store of previously sent notification keys.
pub trait Ledger: Send {
    /// Human-readable location for log lines.
    fn describe(&self) -> String;

    /// Every key recorded so far. Missing storage yields an empty set.
    fn load(&mut self) -> Result<HashSet<NotificationKey>>;

    /// Record a confirmed send. Appending an existing key again is harmless.
    fn append(&mut self, entry: &LedgerEntry) -> Result<()>;
}

/// Open the configured ledger backend.
pub fn open(cfg: &LedgerConfig) -> Result<Box<dyn Ledger>> {
    let ledger: Box<dyn Ledger> = match cfg.backend {
        LedgerBackend::Csv => Box::new(CsvLedger::new(&cfg.path)),
        LedgerBackend::Sqlite => Box::new(SqliteLedger::open(&cfg.path)?),
    };
    info!(ledger = %ledger.describe(), "ledger opened");
    Ok(ledger)
}

/// Where a key was already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seen {
    /// Sent on an earlier run.
    Ledger,
    /// Claimed earlier in this run by another row.
    ThisRun,
}

/// Per-run dedup view: ledger history plus the keys claimed in this run.
///
/// A key is claimed before its dispatch is attempted, so a second row that
/// normalizes to the same key is skipped even if the first send failed or
/// the ledger write has not happened yet.
#[derive(Debug, Default)]
pub struct DedupGuard {
    history: HashSet<NotificationKey>,
    claimed: HashSet<NotificationKey>,
}

impl DedupGuard {
    pub fn new(history: HashSet<NotificationKey>) -> Self {
        Self {
            history,
            claimed: HashSet::new(),
        }
    }

    pub fn seen(&self, key: &NotificationKey) -> Option<Seen> {
        if self.claimed.contains(key) {
            Some(Seen::ThisRun)
        } else if self.history.contains(key) {
            Some(Seen::Ledger)
        } else {
            None
        }
    }

    pub fn contains(&self, key: &NotificationKey) -> bool {
        self.seen(key).is_some()
    }

    /// Mark `key` as handled for the rest of the run. Returns `false` if it
    /// was already seen.
    pub fn claim(&mut self, key: &NotificationKey) -> bool {
        if self.contains(key) {
            return false;
        }
        self.claimed.insert(key.clone())
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(days: &str) -> NotificationKey {
        NotificationKey::new("BZ10ABC", "itp", "2025-04-03", days)
    }

    #[test]
    fn history_keys_are_seen() {
        let guard = DedupGuard::new([key("7")].into_iter().collect());
        assert_eq!(guard.seen(&key("7")), Some(Seen::Ledger));
        assert!(!guard.contains(&key("4")));
        assert_eq!(guard.history_len(), 1);
    }

    #[test]
    fn claim_is_once_per_run() {
        let mut guard = DedupGuard::default();
        assert!(guard.claim(&key("7")));
        assert!(!guard.claim(&key("7")));
        assert_eq!(guard.seen(&key("7")), Some(Seen::ThisRun));
    }

    #[test]
    fn cannot_claim_history_key() {
        let mut guard = DedupGuard::new([key("7")].into_iter().collect());
        assert!(!guard.claim(&key("7")));
    }
}
