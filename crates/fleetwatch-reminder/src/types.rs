use chrono::{DateTime, NaiveDate, TimeZone};
use fleetwatch_core::{DocumentType, VehicleId};
use serde::{Deserialize, Serialize};

/// Canonical date rendering used in keys, ledger rows and messages.
pub const ISO_DATE: &str = "%Y-%m-%d";

/// One row of the fleet sheet, as ingested for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetRecord {
    pub vehicle: VehicleId,
    /// Make / display label, e.g. `"Volvo"`. `None` when the cell is blank
    /// or the column is absent.
    pub label: Option<String>,
    /// Raw expiration cell per active document type, in column order.
    pub documents: Vec<(DocumentType, String)>,
}

/// Where an expiration date sits relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Still valid; `days_left` matched a threshold.
    Upcoming,
    /// Expires today.
    DueToday,
    /// Expired `|days_left|` days ago.
    Overdue,
}

impl Stage {
    pub fn of(days_left: i64) -> Self {
        match days_left {
            d if d > 0 => Stage::Upcoming,
            0 => Stage::DueToday,
            _ => Stage::Overdue,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Upcoming => "upcoming",
            Stage::DueToday => "due_today",
            Stage::Overdue => "overdue",
        };
        write!(f, "{s}")
    }
}

/// A (vehicle, document) pair whose date fires today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationEvent {
    pub vehicle: VehicleId,
    pub label: Option<String>,
    pub document: DocumentType,
    pub expires_on: NaiveDate,
    /// `expires_on - today` in whole days; negative once overdue.
    pub days_left: i64,
}

impl ExpirationEvent {
    pub fn key(&self) -> NotificationKey {
        NotificationKey::new(
            &self.vehicle.key_form(),
            &self.document.key_form(),
            &self.expires_on.format(ISO_DATE).to_string(),
            &self.days_left.to_string(),
        )
    }
}

/// Deduplication identity of a notification.
///
/// Two events with equal keys are the same logical notification and are sent
/// at most once. Fields are stored normalized (trimmed, uppercased) so rows
/// written with different casing still match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationKey {
    pub vehicle: String,
    pub document: String,
    /// ISO `YYYY-MM-DD`.
    pub expires_on: String,
    pub days_left: String,
}

impl NotificationKey {
    pub fn new(vehicle: &str, document: &str, expires_on: &str, days_left: &str) -> Self {
        Self {
            vehicle: vehicle.trim().to_uppercase(),
            document: document.trim().to_uppercase(),
            expires_on: expires_on.trim().to_string(),
            days_left: days_left.trim().to_string(),
        }
    }
}

impl std::fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.vehicle, self.document, self.expires_on, self.days_left
        )
    }
}

/// A row of the sent-notification ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Local wall-clock time of the send, `YYYY-MM-DD HH:MM:SS`.
    pub sent_at: String,
    pub key: NotificationKey,
    /// Recipient address the notification went to.
    pub destination: String,
}

impl LedgerEntry {
    pub fn new<Tz: TimeZone>(key: NotificationKey, destination: &str, sent_at: DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            sent_at: sent_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            key,
            destination: destination.to_string(),
        }
    }
}

/// Tally of one reminder pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Cells holding a usable date.
    pub evaluated: u32,
    /// Notifications the relay accepted.
    pub sent: u32,
    /// Firing events skipped because the ledger or this run already had the key.
    pub already_sent: u32,
    /// Dispatch attempts that failed.
    pub failed: u32,
    /// Non-empty cells that could not be read as a date.
    pub malformed_dates: u32,
    /// Firing events composed but not dispatched (dry run).
    pub planned: u32,
    /// Sends that went out but could not be written to the ledger.
    pub ledger_errors: u32,
}

impl std::fmt::Display for PassSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "evaluated={} sent={} already_sent={} failed={} malformed_dates={} planned={} ledger_errors={}",
            self.evaluated,
            self.sent,
            self.already_sent,
            self.failed,
            self.malformed_dates,
            self.planned,
            self.ledger_errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_by_sign() {
        assert_eq!(Stage::of(30), Stage::Upcoming);
        assert_eq!(Stage::of(1), Stage::Upcoming);
        assert_eq!(Stage::of(0), Stage::DueToday);
        assert_eq!(Stage::of(-1), Stage::Overdue);
    }

    #[test]
    fn summary_line_lists_every_counter() {
        let summary = PassSummary {
            evaluated: 12,
            sent: 3,
            already_sent: 2,
            failed: 1,
            malformed_dates: 1,
            planned: 0,
            ledger_errors: 1,
        };
        assert_eq!(
            summary.to_string(),
            "evaluated=12 sent=3 already_sent=2 failed=1 malformed_dates=1 planned=0 ledger_errors=1"
        );
    }

    #[test]
    fn key_is_normalized() {
        let a = NotificationKey::new(" bz10abc", "itp ", "2025-04-03", "7");
        let b = NotificationKey::new("BZ10ABC", "ITP", "2025-04-03", " 7");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "BZ10ABC/ITP/2025-04-03/7");
    }

    #[test]
    fn event_key_uses_iso_date_and_signed_days() {
        let event = ExpirationEvent {
            vehicle: VehicleId::new("b 123 xyz"),
            label: None,
            document: DocumentType::new("asigurare"),
            expires_on: NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
            days_left: -2,
        };
        let key = event.key();
        assert_eq!(key.vehicle, "B 123 XYZ");
        assert_eq!(key.document, "ASIGURARE");
        assert_eq!(key.expires_on, "2025-01-09");
        assert_eq!(key.days_left, "-2");
    }

    #[test]
    fn event_key_matches_ledger_spelling_of_plate_and_document() {
        let event = ExpirationEvent {
            vehicle: VehicleId::new("bz10abc"),
            label: Some("Volvo".to_string()),
            document: DocumentType::new("Rovinieta"),
            expires_on: NaiveDate::from_ymd_opt(2025, 4, 3).unwrap(),
            days_left: 7,
        };
        let key = event.key();
        assert_eq!(key.vehicle, event.vehicle.key_form());
        assert_eq!(key.document, event.document.key_form());
        assert_eq!(key, NotificationKey::new("BZ10ABC", "ROVINIETA", "2025-04-03", "7"));
    }
}
