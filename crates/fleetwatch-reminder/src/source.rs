use std::{path::PathBuf, time::Duration};

use chrono::Utc;
use fleetwatch_core::config::FleetConfig;
use tracing::info;

use crate::error::{ReminderError, Result};

const USER_AGENT: &str = "fleetwatch";

/// Where the fleet sheet comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetSource {
    /// A sheet published as CSV ("publish to web").
    Url(String),
    /// A local CSV file.
    File(PathBuf),
}

impl FleetSource {
    /// The published URL wins when set; otherwise the local file.
    pub fn from_config(cfg: &FleetConfig) -> Self {
        match cfg.source_url() {
            Some(url) => FleetSource::Url(url.to_string()),
            None => FleetSource::File(PathBuf::from(cfg.csv_path.trim())),
        }
    }

    /// Fetch the raw CSV text.
    pub async fn fetch(&self, timeout: Duration) -> Result<String> {
        match self {
            FleetSource::Url(url) => {
                info!("loading fleet sheet from published CSV url");
                let client = reqwest::Client::builder()
                    .user_agent(USER_AGENT)
                    .timeout(timeout)
                    .build()?;
                let text = client
                    .get(cache_bust(url, Utc::now().timestamp()))
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                Ok(text)
            }
            FleetSource::File(path) => {
                if !path.exists() {
                    return Err(ReminderError::SourceNotFound(path.display().to_string()));
                }
                info!(path = %path.display(), "loading fleet sheet from local file");
                Ok(std::fs::read_to_string(path)?)
            }
        }
    }
}

/// Append a `_=<stamp>` query parameter so intermediate caches serve a fresh copy.
pub fn cache_bust(url: &str, stamp: i64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}_={stamp}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn cache_bust_picks_separator() {
        assert_eq!(cache_bust("https://x/pub", 7), "https://x/pub?_=7");
        assert_eq!(
            cache_bust("https://x/pub?output=csv", 7),
            "https://x/pub?output=csv&_=7"
        );
    }

    #[test]
    fn url_takes_precedence_over_file() {
        let mut cfg = FleetConfig::default();
        assert_eq!(
            FleetSource::from_config(&cfg),
            FleetSource::File(PathBuf::from("camioane.csv"))
        );
        cfg.source_url = Some(" https://example.com/sheet.csv ".to_string());
        assert_eq!(
            FleetSource::from_config(&cfg),
            FleetSource::Url("https://example.com/sheet.csv".to_string())
        );
    }

    #[tokio::test]
    async fn missing_local_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = FleetSource::File(dir.path().join("camioane.csv"));
        let err = source.fetch(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ReminderError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn downloads_with_cache_buster() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sheet.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("nr_masina,rovinieta_expira\n"))
            .expect(1)
            .mount(&server)
            .await;

        let source = FleetSource::Url(format!("{}/sheet.csv?output=csv", server.uri()));
        let text = source.fetch(Duration::from_secs(5)).await.unwrap();
        assert!(text.starts_with("nr_masina"));

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default().to_string();
        assert!(query.starts_with("output=csv&_="), "query was {query}");
    }

    #[tokio::test]
    async fn http_error_status_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = FleetSource::Url(format!("{}/sheet.csv", server.uri()));
        let err = source.fetch(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ReminderError::Fetch(_)));
    }
}
