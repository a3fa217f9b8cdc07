use thiserror::Error;

/// Errors raised while building or delivering a message.
#[derive(Debug, Error)]
pub enum MailError {
    /// A mandatory mail setting is absent.
    #[error("Mail not configured: {0} is not set")]
    NotConfigured(&'static str),

    /// A sender or recipient could not be parsed as a mailbox.
    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The message itself could not be assembled.
    #[error("Message build failed: {0}")]
    Build(String),

    /// Connecting, authenticating or handing the message to the relay failed.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The relay did not answer within the configured time budget.
    #[error("Operation timed out after {ms}ms")]
    Timeout { ms: u64 },
}
