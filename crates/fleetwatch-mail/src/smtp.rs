use std::time::Duration;

use async_trait::async_trait;
use fleetwatch_core::config::MailConfig;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use crate::{
    error::MailError,
    mailer::Mailer,
    types::{sanitize_header, OutgoingMail},
};

/// Port on which the relay expects TLS from the first byte instead of STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Everything needed to talk to an authenticated SMTP relay.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Mailbox used both as `From:` and as the login name.
    pub sender: String,
    pub password: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SmtpSettings {
    pub fn from_config(cfg: &MailConfig) -> Result<Self, MailError> {
        let sender = cfg.sender().ok_or(MailError::NotConfigured("mail.sender"))?;
        let password = cfg
            .password()
            .ok_or(MailError::NotConfigured("mail.password"))?;
        Ok(Self {
            host: cfg.host.trim().to_string(),
            port: cfg.port,
            sender: sender.to_string(),
            password: password.to_string(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        })
    }
}

/// [`Mailer`] backed by lettre's async SMTP transport.
///
/// Port 465 uses implicit TLS; every other port upgrades with STARTTLS.
/// Either way the session is encrypted before credentials are sent.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Result<Self, MailError> {
        let from = parse_mailbox(&settings.sender)?;

        let builder = if settings.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| MailError::SendFailed(format!("relay {}: {e}", settings.host)))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.sender.trim().to_string(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        debug!(host = %settings.host, port = settings.port, "smtp transport ready");

        Ok(Self {
            transport,
            from,
            timeout: settings.timeout,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let to = parse_mailbox(&mail.to)?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(sanitize_header(&mail.subject))
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))?;

        // The transport timeout covers each socket operation; this bounds the
        // whole exchange.
        let budget = self.timeout * 2;
        match tokio::time::timeout(budget, self.transport.send(message)).await {
            Ok(Ok(_response)) => {
                info!(to = %mail.to, subject = %mail.subject, "mail accepted by relay");
                Ok(())
            }
            Ok(Err(e)) => Err(MailError::SendFailed(e.to_string())),
            Err(_) => Err(MailError::Timeout {
                ms: budget.as_millis() as u64,
            }),
        }
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, MailError> {
    let clean = sanitize_header(raw);
    clean
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress {
            address: clean.clone(),
            reason: e.to_string(),
        })
}
