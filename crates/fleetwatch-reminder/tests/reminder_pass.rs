//! End-to-end reminder passes against a CSV ledger on disk.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use fleetwatch_core::config::FleetConfig;
use fleetwatch_mail::{MailError, Mailer, OutgoingMail};
use fleetwatch_reminder::{
    ledger::CsvLedger, FleetSchema, FleetTable, PassSummary, ReminderEngine, ReminderError,
    Thresholds,
};

#[derive(Default)]
struct Outbox(Mutex<Vec<OutgoingMail>>);

#[async_trait]
impl Mailer for Outbox {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.0.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

impl Outbox {
    fn subjects(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|m| m.subject.clone()).collect()
    }
}

const SHEET: &str = "\
nr_masina,marca,rovinieta_expira,itp_expira,asigurare_expira
BZ10ABC,Volvo,2025-04-03,03/04/2025,
B22XYZ,,2025-03-27,2025-03-20,2025-04-26
";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 27).unwrap()
}

fn schema() -> FleetSchema {
    FleetSchema::from_config(&FleetConfig::default())
}

async fn pass(ledger_path: &Path, sheet: &str, outbox: Arc<Outbox>) -> PassSummary {
    let table = FleetTable::parse(sheet, &schema()).unwrap();
    let mut engine = ReminderEngine::new(
        Thresholds::default(),
        Box::new(CsvLedger::new(ledger_path)),
        outbox,
        "ops@example.com",
        chrono_tz::Europe::Bucharest,
    );
    engine.run(&table, today()).await.unwrap()
}

#[tokio::test]
async fn second_run_same_day_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("sent_log.csv");

    let first = Arc::new(Outbox::default());
    let summary = pass(&ledger, SHEET, first.clone()).await;
    // BZ10ABC: two documents at 7 days. B22XYZ: due today, overdue 7 days, 30 days ahead.
    assert_eq!(summary.sent, 5);
    assert_eq!(summary.already_sent, 0);

    let mut subjects = first.subjects();
    subjects.sort();
    assert_eq!(
        subjects,
        vec![
            "Expira asigurare la B22XYZ in 30 zile".to_string(),
            "Expira itp la Volvo BZ10ABC in 7 zile".to_string(),
            "Expira rovinieta la Volvo BZ10ABC in 7 zile".to_string(),
            "[AZI] Expira rovinieta la B22XYZ".to_string(),
            "[EXPIRAT] itp la B22XYZ - expirat de 7 zile".to_string(),
        ]
    );

    let second = Arc::new(Outbox::default());
    let summary = pass(&ledger, SHEET, second.clone()).await;
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.already_sent, 5);
    assert!(second.subjects().is_empty());
}

#[tokio::test]
async fn rows_collapsing_to_one_key_send_once() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = "nr_masina,rovinieta_expira\nbz10abc,2025-04-03\n BZ10ABC ,03.04.2025\n";

    let outbox = Arc::new(Outbox::default());
    let summary = pass(&dir.path().join("sent_log.csv"), sheet, outbox.clone()).await;
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.already_sent, 1);
}

#[tokio::test]
async fn absent_optional_column_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = "nr_masina;rovinieta_expira\nBZ10ABC;2025-04-03\n";

    let outbox = Arc::new(Outbox::default());
    let summary = pass(&dir.path().join("sent_log.csv"), sheet, outbox.clone()).await;
    assert_eq!(summary.sent, 1);
}

#[test]
fn missing_mandatory_column_stops_before_dispatch() {
    let sheet = "plate,itp_expira\nBZ10ABC,2025-04-03\n";
    let err = FleetTable::parse(sheet, &schema()).unwrap_err();
    assert!(matches!(err, ReminderError::MissingColumns(_)));
    assert!(err.to_string().contains("nr_masina"));
}
