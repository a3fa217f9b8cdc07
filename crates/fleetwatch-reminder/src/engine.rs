use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use fleetwatch_mail::{Mailer, OutgoingMail};
use tracing::{debug, error, info, warn};

use crate::{
    compose::compose_event,
    date::{normalize_date, DateField},
    error::Result,
    fleet::FleetTable,
    ledger::{DedupGuard, Ledger, Seen},
    trigger::{evaluate, Thresholds},
    types::{ExpirationEvent, LedgerEntry, PassSummary},
};

/// One reminder pass over the fleet: evaluate, dedup, compose, dispatch, record.
pub struct ReminderEngine {
    thresholds: Thresholds,
    ledger: Box<dyn Ledger>,
    mailer: Arc<dyn Mailer>,
    recipient: String,
    tz: Tz,
    dry_run: bool,
}

impl ReminderEngine {
    pub fn new(
        thresholds: Thresholds,
        ledger: Box<dyn Ledger>,
        mailer: Arc<dyn Mailer>,
        recipient: &str,
        tz: Tz,
    ) -> Self {
        Self {
            thresholds,
            ledger,
            mailer,
            recipient: recipient.to_string(),
            tz,
            dry_run: false,
        }
    }

    /// Compose and log but neither send nor touch the ledger.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the pass for calendar day `today`.
    ///
    /// Only a ledger that exists but cannot be read aborts the pass. Bad
    /// cells and failed sends are logged, counted, and skipped.
    pub async fn run(&mut self, table: &FleetTable, today: NaiveDate) -> Result<PassSummary> {
        let history = self.ledger.load()?;
        let mut guard = DedupGuard::new(history);
        let mut summary = PassSummary::default();

        info!(
            %today,
            vehicles = table.records.len(),
            ledger_keys = guard.history_len(),
            dry_run = self.dry_run,
            "reminder pass started"
        );

        for record in &table.records {
            for (document, raw) in &record.documents {
                let expires_on = match normalize_date(raw) {
                    DateField::Date(d) => d,
                    DateField::Empty => continue,
                    DateField::Malformed(value) => {
                        warn!(vehicle = %record.vehicle, %document, value = %value, "cannot read expiration date");
                        summary.malformed_dates += 1;
                        continue;
                    }
                };
                summary.evaluated += 1;

                let Some(trigger) = evaluate(expires_on, today, &self.thresholds) else {
                    continue;
                };

                let event = ExpirationEvent {
                    vehicle: record.vehicle.clone(),
                    label: record.label.clone(),
                    document: document.clone(),
                    expires_on,
                    days_left: trigger.days_left,
                };
                let key = event.key();

                if let Some(seen) = guard.seen(&key) {
                    let source = match seen {
                        Seen::Ledger => "ledger",
                        Seen::ThisRun => "this run",
                    };
                    info!(%key, already_in = source, "skip, already sent");
                    summary.already_sent += 1;
                    continue;
                }
                guard.claim(&key);

                let composed = compose_event(&event);
                if self.dry_run {
                    info!(%key, stage = %trigger.stage, subject = %composed.subject, "dry run, not sent");
                    summary.planned += 1;
                    continue;
                }

                let mail = OutgoingMail::new(&self.recipient, composed.subject, composed.body);
                match self.mailer.send(&mail).await {
                    Ok(()) => {
                        summary.sent += 1;
                        info!(%key, stage = %trigger.stage, subject = %mail.subject, "sent");
                        let entry = LedgerEntry::new(
                            key.clone(),
                            &self.recipient,
                            Utc::now().with_timezone(&self.tz),
                        );
                        if let Err(e) = self.ledger.append(&entry) {
                            warn!(%key, error = %e, "sent but not recorded in ledger; may repeat next run");
                            summary.ledger_errors += 1;
                        }
                    }
                    Err(e) => {
                        error!(
                            %key,
                            mailer = self.mailer.name(),
                            error = %e,
                            "send failed, continuing with remaining vehicles"
                        );
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            evaluated = summary.evaluated,
            sent = summary.sent,
            already_sent = summary.already_sent,
            failed = summary.failed,
            malformed_dates = summary.malformed_dates,
            planned = summary.planned,
            ledger_errors = summary.ledger_errors,
            "reminder pass finished"
        );
        debug!(?summary, "pass summary");
        Ok(summary)
    }
}
