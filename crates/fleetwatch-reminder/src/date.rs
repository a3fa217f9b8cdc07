use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Cell values that mean "no date" rather than "bad date".
const PLACEHOLDERS: [&str; 4] = ["", "na", "none", "nan"];

/// Full-year shapes, ISO first, then day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Only tried when the last numeric group has two digits, otherwise `%Y`
/// would happily read `25` as the year 25.
const SHORT_YEAR_FORMATS: &[&str] = &["%d/%m/%y", "%d.%m.%y", "%d-%m-%y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Outcome of reading one expiration cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateField {
    Date(NaiveDate),
    /// Blank or a placeholder such as `NA`. Not worth a warning.
    Empty,
    /// Something was written but it is not a date we understand.
    Malformed(String),
}

impl DateField {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DateField::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Read a free-form date cell. Never fails.
///
/// Ambiguous numeric dates are read day-first: `03/04/2025` is 3 April.
/// Date-times are reduced to their calendar date.
pub fn normalize_date(raw: &str) -> DateField {
    let value = raw.trim();
    if is_placeholder(value) {
        return DateField::Empty;
    }
    match parse_day_first(value) {
        Some(date) => DateField::Date(date),
        None => DateField::Malformed(value.to_string()),
    }
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS
        .iter()
        .any(|p| value.eq_ignore_ascii_case(p))
}

fn parse_day_first(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    let formats = if has_short_year(value) {
        SHORT_YEAR_FORMATS
    } else {
        DATE_FORMATS
    };

    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                .map(|dt| dt.date())
        })
        .filter(|d| (1900..=2999).contains(&d.year()))
}

/// `03/04/25`, `3.4.25`: three numeric groups, the last one two digits wide.
fn has_short_year(value: &str) -> bool {
    let groups: Vec<&str> = value.split(['/', '.', '-']).collect();
    groups.len() == 3
        && groups
            .iter()
            .all(|g| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit()))
        && groups[0].len() <= 2
        && groups[2].len() == 2
}
