use fleetwatch_mail::MailError;
use thiserror::Error;

/// Errors that end a watchdog or failure-notice invocation.
///
/// "No successful run today" is not an error; it is
/// [`Verdict::Alert`](crate::types::Verdict::Alert).
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// Transport failure or timeout talking to the run-history API.
    #[error("Could not check run history: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not check run history: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not check run history: unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Alert dispatch failed: {0}")]
    Dispatch(#[from] MailError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WatchdogError>;
