use std::time::Duration;

use async_trait::async_trait;
use fleetwatch_core::config::WatchdogConfig;
use tracing::debug;

use crate::{
    error::{Result, WatchdogError},
    types::{RunSummary, RunsPage},
};

const USER_AGENT: &str = "fleetwatch-watchdog";

/// Source of recent runs for the monitored workflow, most recent first.
#[async_trait]
pub trait RunHistory: Send + Sync {
    /// Human-readable job identifier used in logs and alerts.
    fn job(&self) -> String;

    async fn recent_runs(&self) -> Result<Vec<RunSummary>>;
}

/// GitHub Actions REST client for one workflow.
pub struct GitHubRunHistory {
    client: reqwest::Client,
    url: String,
    repository: String,
    workflow: String,
    token: String,
    per_page: u32,
}

impl GitHubRunHistory {
    pub fn new(
        api_base: &str,
        repository: &str,
        workflow: &str,
        token: &str,
        per_page: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        let url = format!(
            "{}/repos/{}/actions/workflows/{}/runs",
            api_base.trim_end_matches('/'),
            repository.trim(),
            workflow.trim()
        );
        Ok(Self {
            client,
            url,
            repository: repository.trim().to_string(),
            workflow: workflow.trim().to_string(),
            token: token.to_string(),
            per_page,
        })
    }

    pub fn from_config(cfg: &WatchdogConfig) -> Result<Self> {
        let repository = cfg
            .repository()
            .ok_or_else(|| WatchdogError::Config("watchdog.repository is not set".to_string()))?;
        let token = cfg
            .token()
            .ok_or_else(|| WatchdogError::Config("watchdog.token is not set".to_string()))?;
        Self::new(
            &cfg.api_base,
            repository,
            &cfg.workflow,
            token,
            cfg.per_page,
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RunHistory for GitHubRunHistory {
    fn job(&self) -> String {
        format!("{}/{}", self.repository, self.workflow)
    }

    async fn recent_runs(&self) -> Result<Vec<RunSummary>> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[("per_page", self.per_page)])
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(WatchdogError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let page: RunsPage = serde_json::from_str(&body)?;
        debug!(
            total = page.total_count,
            returned = page.workflow_runs.len(),
            "run history fetched"
        );
        Ok(page.workflow_runs)
    }
}
