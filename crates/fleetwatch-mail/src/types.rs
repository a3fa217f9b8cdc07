use serde::{Deserialize, Serialize};

/// A message ready to hand to a [`Mailer`](crate::Mailer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    /// Recipient address.
    pub to: String,

    /// Subject line; sanitized again by the transport.
    pub subject: String,

    /// Plain-text body.
    pub body: String,
}

impl OutgoingMail {
    pub fn new(to: &str, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: sanitize_header(to),
            subject: sanitize_header(&subject.into()),
            body: body.into(),
        }
    }
}

/// Collapse a header value onto a single line.
///
/// CR and LF (and any run of whitespace around them) become one space so a
/// value taken from the fleet sheet can never inject extra headers.
pub fn sanitize_header(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
