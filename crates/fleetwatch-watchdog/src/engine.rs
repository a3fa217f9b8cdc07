use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use fleetwatch_core::config::WatchdogConfig;
use fleetwatch_mail::{Mailer, OutgoingMail};
use tracing::{error, info, warn};

use crate::{
    alert::{self, AlertContext},
    error::Result,
    history::RunHistory,
    types::{RunSummary, Verdict},
    window::CheckWindow,
};

/// Liveness check for the daily reminder run.
///
/// Decision order: forced test, then the grace window (no fetch before the
/// boundary), then the run history. Only an `Alert` or a forced test sends mail.
pub struct Watchdog {
    history: Arc<dyn RunHistory>,
    mailer: Arc<dyn Mailer>,
    recipient: String,
    tz: Tz,
    expected_hour: u32,
    grace_minutes: u32,
    force_test: bool,
}

impl Watchdog {
    pub fn new(
        cfg: &WatchdogConfig,
        tz: Tz,
        history: Arc<dyn RunHistory>,
        mailer: Arc<dyn Mailer>,
        recipient: &str,
    ) -> Self {
        Self {
            history,
            mailer,
            recipient: recipient.to_string(),
            tz,
            expected_hour: cfg.expected_hour,
            grace_minutes: cfg.grace_minutes,
            force_test: cfg.force_test,
        }
    }

    pub async fn check(&self, now: DateTime<Utc>) -> Result<Verdict> {
        let window = CheckWindow::compute(now, self.tz, self.expected_hour, self.grace_minutes)?;
        let job = self.history.job();
        let ctx = AlertContext {
            job: &job,
            expected_hour: self.expected_hour,
            grace_minutes: self.grace_minutes,
            tz: self.tz,
            checked_at: window.now_local,
        };

        if self.force_test {
            info!(%job, "forced test, sending test message");
            let (subject, body) = alert::forced_test(&ctx);
            self.dispatch(subject, body).await?;
            return Ok(Verdict::ForcedTest);
        }

        if window.is_too_early() {
            info!(
                now = %window.now_local,
                boundary = %window.boundary,
                "still inside grace window, not checking"
            );
            return Ok(Verdict::TooEarly);
        }

        let runs = match self.history.recent_runs().await {
            Ok(runs) => runs,
            Err(e) => {
                error!(%job, error = %e, "could not check run history");
                return Err(e);
            }
        };

        if let Some(run) = find_qualifying_run(&runs, window.midnight_utc) {
            info!(%job, run_id = run.id, started_at = %run.started_at(), "successful run found today");
            return Ok(Verdict::Ok { run_id: run.id });
        }

        let last_run = runs.first().cloned();
        warn!(
            %job,
            since = %window.midnight_utc,
            runs_seen = runs.len(),
            "no successful run today, sending alert"
        );
        let (subject, body) = alert::missed_run(&ctx, last_run.as_ref());
        self.dispatch(subject, body).await?;
        Ok(Verdict::Alert { last_run })
    }

    async fn dispatch(&self, subject: String, body: String) -> Result<()> {
        let mail = OutgoingMail::new(&self.recipient, subject, body);
        self.mailer.send(&mail).await?;
        info!(subject = %mail.subject, mailer = self.mailer.name(), "watchdog mail sent");
        Ok(())
    }
}

/// First run, in feed order, whose latest attempt started at or after `since`
/// and succeeded.
pub fn find_qualifying_run(runs: &[RunSummary], since: DateTime<Utc>) -> Option<&RunSummary> {
    runs.iter().find(|r| r.started_at() >= since && r.succeeded())
}
