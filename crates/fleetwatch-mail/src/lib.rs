//! `fleetwatch-mail`: the single dispatch primitive used by every command.
//!
//! Callers hand an [`OutgoingMail`] to anything implementing [`Mailer`]. The
//! production implementation is [`SmtpMailer`]; tests substitute in-memory
//! fakes.

pub mod error;
pub mod mailer;
pub mod smtp;
pub mod types;

pub use error::MailError;
pub use mailer::Mailer;
pub use smtp::{SmtpMailer, SmtpSettings};
pub use types::{sanitize_header, OutgoingMail};
