use std::collections::HashSet;

use rusqlite::Connection;

use super::Ledger;
use crate::{
    error::Result,
    types::{LedgerEntry, NotificationKey},
};

/// Initialise the ledger schema in `conn`.
///
/// Creates the `sent_notifications` table (idempotent) and an index over the
/// dedup key columns.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sent_notifications (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            sent_at     TEXT    NOT NULL,
            vehicle_id  TEXT    NOT NULL,
            document    TEXT    NOT NULL,
            expires_on  TEXT    NOT NULL,   -- ISO date
            days_left   TEXT    NOT NULL,   -- signed, as text
            destination TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sent_key
            ON sent_notifications (vehicle_id, document, expires_on, days_left);
        ",
    )?;
    Ok(())
}

/// Ledger stored in a single SQLite table.
pub struct SqliteLedger {
    conn: Connection,
    label: String,
}

impl SqliteLedger {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, path)
    }

    pub fn with_connection(conn: Connection, label: &str) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn,
            label: label.to_string(),
        })
    }
}

impl Ledger for SqliteLedger {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.label)
    }

    fn load(&mut self) -> Result<HashSet<NotificationKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT vehicle_id, document, expires_on, days_left FROM sent_notifications",
        )?;
        let keys = stmt
            .query_map([], |row| {
                Ok(NotificationKey::new(
                    &row.get::<_, String>(0)?,
                    &row.get::<_, String>(1)?,
                    &row.get::<_, String>(2)?,
                    &row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(keys)
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sent_notifications
             (sent_at, vehicle_id, document, expires_on, days_left, destination)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                entry.sent_at,
                entry.key.vehicle,
                entry.key.document,
                entry.key.expires_on,
                entry.key.days_left,
                entry.destination,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> SqliteLedger {
        SqliteLedger::with_connection(Connection::open_in_memory().unwrap(), ":memory:").unwrap()
    }

    fn entry(days: &str) -> LedgerEntry {
        LedgerEntry {
            sent_at: "2025-03-27 08:00:00".to_string(),
            key: NotificationKey::new("BZ10ABC", "itp", "2025-04-03", days),
            destination: "ops@example.com".to_string(),
        }
    }

    #[test]
    fn empty_table_loads_empty() {
        assert!(ledger().load().unwrap().is_empty());
    }

    #[test]
    fn appended_keys_are_loaded() {
        let mut l = ledger();
        l.append(&entry("7")).unwrap();
        l.append(&entry("7")).unwrap();
        l.append(&entry("4")).unwrap();
        let keys = l.load().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&entry("4").key));
    }

    #[test]
    fn schema_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
    }
}
