//! Mail text for each firing stage. Pure functions, no I/O.

use chrono::NaiveDate;

use crate::types::{ExpirationEvent, Stage, ISO_DATE};

const FOOTER: &str = "Acest mesaj a fost generat automat.";

/// Subject and body of one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub subject: String,
    pub body: String,
}

/// Literal inputs of a message, independent of how they were derived.
#[derive(Debug, Clone, Copy)]
pub struct MessageInput<'a> {
    /// Document label, e.g. `"itp"`.
    pub document: &'a str,
    /// Vehicle make shown before the plate, if any.
    pub make: Option<&'a str>,
    pub vehicle: &'a str,
    pub expires_on: NaiveDate,
    pub days_left: i64,
}

impl<'a> From<&'a ExpirationEvent> for MessageInput<'a> {
    fn from(event: &'a ExpirationEvent) -> Self {
        Self {
            document: event.document.as_str(),
            make: event.label.as_deref(),
            vehicle: event.vehicle.as_str(),
            expires_on: event.expires_on,
            days_left: event.days_left,
        }
    }
}

/// `"1 zi"` or `"N zile"`; the magnitude decides, the sign is dropped.
pub fn plural_days(n: i64) -> String {
    match n.unsigned_abs() {
        1 => "1 zi".to_string(),
        m => format!("{m} zile"),
    }
}

pub fn compose_event(event: &ExpirationEvent) -> Composed {
    compose(&MessageInput::from(event))
}

pub fn compose(input: &MessageInput<'_>) -> Composed {
    let vehicle = match input.make.map(str::trim).filter(|m| !m.is_empty()) {
        Some(make) => format!("{make} {}", input.vehicle),
        None => input.vehicle.to_string(),
    };
    let date = input.expires_on.format(ISO_DATE);
    let doc = input.document;
    let days = plural_days(input.days_left);

    match Stage::of(input.days_left) {
        Stage::Upcoming => {
            // "A ramas 1 zi" / "Au ramas 7 zile"
            let verb = if input.days_left == 1 { "A ramas" } else { "Au ramas" };
            Composed {
                subject: format!("Expira {doc} la {vehicle} in {days}"),
                body: format!(
                    "Avertizare expirare: {doc}\n\
                     Masina: {vehicle}\n\
                     Data expirarii: {date}\n\
                     {verb}: {days}\n\n\
                     {FOOTER}"
                ),
            }
        }
        Stage::DueToday => Composed {
            subject: format!("[AZI] Expira {doc} la {vehicle}"),
            body: format!(
                "Expira astazi: {doc}\n\
                 Masina: {vehicle}\n\
                 Data expirarii: {date}\n\n\
                 Reinnoieste documentul astazi.\n\n\
                 {FOOTER}"
            ),
        },
        Stage::Overdue => Composed {
            subject: format!("[EXPIRAT] {doc} la {vehicle} - expirat de {days}"),
            body: format!(
                "Document expirat: {doc}\n\
                 Masina: {vehicle}\n\
                 Data expirarii: {date}\n\
                 Expirat de: {days}\n\n\
                 Documentul trebuie reinnoit urgent.\n\n\
                 {FOOTER}"
            ),
        },
    }
}
