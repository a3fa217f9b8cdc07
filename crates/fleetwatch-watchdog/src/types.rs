use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One workflow run as reported by the run-history feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: u64,
    #[serde(default)]
    pub run_number: Option<u64>,
    /// `queued`, `in_progress`, `completed`, ...
    #[serde(default)]
    pub status: Option<String>,
    /// `success`, `failure`, `cancelled`, ...; `None` while still running.
    #[serde(default)]
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Moves forward when a run is re-run; `created_at` does not.
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub head_branch: Option<String>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.conclusion.as_deref() == Some("success")
    }

    /// When the latest attempt of this run started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.run_started_at.unwrap_or(self.created_at)
    }

    /// One-line rendering for logs and alert bodies.
    pub fn describe(&self) -> String {
        let dash = "-";
        format!(
            "#{} status={} conclusion={} started_at={} event={} branch={} {}",
            self.run_number.unwrap_or(self.id),
            self.status.as_deref().unwrap_or(dash),
            self.conclusion.as_deref().unwrap_or(dash),
            self.started_at().to_rfc3339(),
            self.event.as_deref().unwrap_or(dash),
            self.head_branch.as_deref().unwrap_or(dash),
            self.html_url,
        )
    }
}

/// `GET .../actions/workflows/{workflow}/runs` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunsPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<RunSummary>,
}

/// Outcome of one watchdog invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Forced-test flag set; a test message was sent and nothing was checked.
    ForcedTest,
    /// Still inside the grace window; history was not fetched.
    TooEarly,
    /// A successful run started after local midnight.
    Ok { run_id: u64 },
    /// No qualifying run; one alert was dispatched.
    Alert { last_run: Option<RunSummary> },
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::ForcedTest => write!(f, "forced_test"),
            Verdict::TooEarly => write!(f, "too_early"),
            Verdict::Ok { run_id } => write!(f, "ok (run {run_id})"),
            Verdict::Alert { .. } => write!(f, "alert"),
        }
    }
}
