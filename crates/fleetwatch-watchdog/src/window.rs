//! Local-time arithmetic for the liveness check.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, WatchdogError};

/// Step used to walk out of a DST gap.
const GAP_STEP_MINUTES: i64 = 15;
/// No zone skips more than this.
const MAX_GAP_MINUTES: i64 = 180;

/// The instants that decide one watchdog invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckWindow {
    pub now_local: DateTime<Tz>,
    /// `today expected_hour:00 + grace` in local time. Before it, judgment is withheld.
    pub boundary: DateTime<Tz>,
    /// Start of the local calendar day, in UTC, for comparing run timestamps.
    pub midnight_utc: DateTime<Utc>,
}

impl CheckWindow {
    pub fn compute(
        now: DateTime<Utc>,
        tz: Tz,
        expected_hour: u32,
        grace_minutes: u32,
    ) -> Result<Self> {
        let now_local = now.with_timezone(&tz);
        let today = now_local.date_naive();

        let expected = local_at(tz, today, expected_hour)?;
        let boundary = expected + TimeDelta::minutes(i64::from(grace_minutes));
        let midnight_utc = local_at(tz, today, 0)?.with_timezone(&Utc);

        Ok(Self {
            now_local,
            boundary,
            midnight_utc,
        })
    }

    pub fn is_too_early(&self) -> bool {
        self.now_local < self.boundary
    }
}

/// `date hour:00` in `tz`.
///
/// An ambiguous wall time (clocks going back) resolves to the earlier
/// instant. A wall time inside a DST gap resolves to the first valid instant
/// after it.
pub fn local_at(tz: Tz, date: NaiveDate, hour: u32) -> Result<DateTime<Tz>> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| WatchdogError::Config(format!("invalid expected hour {hour}")))?;

    let mut offset = 0;
    while offset <= MAX_GAP_MINUTES {
        let candidate = naive + TimeDelta::minutes(offset);
        if let Some(t) = tz.from_local_datetime(&candidate).earliest() {
            return Ok(t);
        }
        offset += GAP_STEP_MINUTES;
    }
    Err(WatchdogError::Config(format!(
        "no valid local time for {naive} in {tz}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Bucharest;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn boundary_and_midnight_in_winter_time() {
        // Bucharest is UTC+2 in January.
        let w = CheckWindow::compute(utc("2025-01-15T09:00:00Z"), Bucharest, 8, 90).unwrap();
        assert_eq!(w.boundary.with_timezone(&Utc), utc("2025-01-15T07:30:00Z"));
        assert_eq!(w.midnight_utc, utc("2025-01-14T22:00:00Z"));
        assert!(!w.is_too_early());
    }

    #[test]
    fn one_minute_before_boundary_is_too_early() {
        let w = CheckWindow::compute(utc("2025-01-15T07:29:00Z"), Bucharest, 8, 90).unwrap();
        assert!(w.is_too_early());
        let w = CheckWindow::compute(utc("2025-01-15T07:30:00Z"), Bucharest, 8, 90).unwrap();
        assert!(!w.is_too_early());
    }

    #[test]
    fn summer_time_shifts_utc_boundary() {
        // UTC+3 in July.
        let w = CheckWindow::compute(utc("2025-07-01T06:00:00Z"), Bucharest, 8, 90).unwrap();
        assert_eq!(w.boundary.with_timezone(&Utc), utc("2025-07-01T06:30:00Z"));
        assert_eq!(w.midnight_utc, utc("2025-06-30T21:00:00Z"));
    }

    #[test]
    fn hour_in_spring_gap_moves_forward() {
        // 2025-03-30 03:00 does not exist in Bucharest; clocks jump to 04:00 (UTC+3).
        let day = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let t = local_at(Bucharest, day, 3).unwrap();
        assert_eq!(t.with_timezone(&Utc), utc("2025-03-30T01:00:00Z"));
    }

    #[test]
    fn ambiguous_autumn_hour_takes_earlier_instant() {
        // 2025-10-26 03:00 happens twice; the first one is still UTC+3.
        let day = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();
        let t = local_at(Bucharest, day, 3).unwrap();
        assert_eq!(t.with_timezone(&Utc), utc("2025-10-26T00:00:00Z"));
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(local_at(Bucharest, day, 24).is_err());
    }
}
