use async_trait::async_trait;

use crate::{error::MailError, types::OutgoingMail};

/// Common interface for anything that can deliver a notification mail.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// between the reminder pass and the watchdog.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Stable lowercase identifier used in log fields (e.g. `"smtp"`).
    fn name(&self) -> &str;

    /// Deliver one message. Returns only once the relay has accepted it.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}
