//! Failure notice sent by CI when the reminder job itself fails.

use fleetwatch_core::FleetwatchConfig;
use fleetwatch_mail::{Mailer, OutgoingMail};
use tracing::info;

use crate::{error::Result, tail::tail_text};

const RULE_WIDTH: usize = 40;
const UNKNOWN_RUN_URL: &str = "(run url indisponibil)";

/// Everything a failure notice reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub repository: String,
    pub workflow: String,
    pub run_url: String,
    pub log_path: String,
    pub log_tail: String,
}

impl FailureReport {
    /// Collect the report from configuration and the diagnostic log on disk.
    pub fn gather(cfg: &FleetwatchConfig) -> Self {
        let repository = cfg.watchdog.repository().unwrap_or_default().to_string();
        let workflow = cfg
            .failure
            .workflow
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        Self {
            run_url: run_url(&cfg.failure.server_url, &repository, cfg.failure.run_id),
            log_tail: tail_text(&cfg.log.path, cfg.log.tail_lines),
            log_path: cfg.log.path.clone(),
            repository,
            workflow,
        }
    }

    pub fn compose(&self) -> (String, String) {
        let subject = format!(
            "[ALERTA] Workflow FAILED: {} ({})",
            self.workflow, self.repository
        );
        let rule = "-".repeat(RULE_WIDTH);
        let body = format!(
            "Reminder bot NU a rulat cu succes.\n\n\
             Repo: {repo}\n\
             Workflow: {workflow}\n\
             Run: {url}\n\n\
             Ultimele linii din {log}:\n\
             {rule}\n\
             {tail}\n\
             {rule}\n",
            repo = self.repository,
            workflow = self.workflow,
            url = self.run_url,
            log = self.log_path,
            tail = self.log_tail,
        );
        (subject, body)
    }

    pub async fn send(&self, mailer: &dyn Mailer, recipient: &str) -> Result<()> {
        let (subject, body) = self.compose();
        let mail = OutgoingMail::new(recipient, subject, body);
        mailer.send(&mail).await?;
        info!(subject = %mail.subject, "failure notice sent");
        Ok(())
    }
}

/// `{server}/{repo}/actions/runs/{id}`, or a placeholder when either part is unknown.
pub fn run_url(server: &str, repository: &str, run_id: Option<u64>) -> String {
    match run_id {
        Some(id) if !repository.is_empty() => format!(
            "{}/{}/actions/runs/{id}",
            server.trim_end_matches('/'),
            repository
        ),
        _ => UNKNOWN_RUN_URL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_url_needs_repo_and_id() {
        assert_eq!(
            run_url("https://github.com/", "acme/fleet", Some(42)),
            "https://github.com/acme/fleet/actions/runs/42"
        );
        assert_eq!(run_url("https://github.com", "", Some(42)), UNKNOWN_RUN_URL);
        assert_eq!(run_url("https://github.com", "acme/fleet", None), UNKNOWN_RUN_URL);
    }

    #[test]
    fn gather_reads_log_tail_and_ci_context() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        std::fs::write(&log, "start\nboom\n").unwrap();

        let mut cfg = FleetwatchConfig::default();
        cfg.watchdog.repository = Some("acme/fleet".to_string());
        cfg.failure.workflow = Some("Run reminder".to_string());
        cfg.failure.run_id = Some(42);
        cfg.log.path = log.display().to_string();

        let report = FailureReport::gather(&cfg);
        assert_eq!(report.log_tail, "start\nboom");

        let (subject, body) = report.compose();
        assert_eq!(subject, "[ALERTA] Workflow FAILED: Run reminder (acme/fleet)");
        assert!(body.contains("Run: https://github.com/acme/fleet/actions/runs/42"));
        let rule = "-".repeat(40);
        assert!(body.contains(&format!("{rule}\nstart\nboom\n{rule}\n")));
    }

    #[test]
    fn missing_log_still_composes() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = FleetwatchConfig::default();
        cfg.log.path = dir.path().join("app.log").display().to_string();

        let (_, body) = FailureReport::gather(&cfg).compose();
        assert!(body.contains("(Nu am gasit "));
        assert!(body.contains(UNKNOWN_RUN_URL));
    }
}
