use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::{
    error::{ReminderError, Result},
    types::Stage,
};

/// Days-before-expiry at which exactly one reminder fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds(BTreeSet<i64>);

impl Thresholds {
    pub fn new(days: impl IntoIterator<Item = i64>) -> Result<Self> {
        let mut set = BTreeSet::new();
        for d in days {
            if d < 0 {
                return Err(ReminderError::InvalidThreshold(d));
            }
            set.insert(d);
        }
        Ok(Self(set))
    }

    pub fn contains(&self, days_left: i64) -> bool {
        self.0.contains(&days_left)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self(fleetwatch_core::config::DEFAULT_THRESHOLDS.into_iter().collect())
    }
}

/// A firing decision for one expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub days_left: i64,
    pub stage: Stage,
}

/// Whole days from `today` until `expires_on`; negative once expired.
pub fn days_left(expires_on: NaiveDate, today: NaiveDate) -> i64 {
    (expires_on - today).num_days()
}

/// Decide whether `expires_on` produces a notification today.
///
/// Future dates fire only on threshold days. Once overdue, every day fires
/// until the date in the sheet changes.
pub fn evaluate(expires_on: NaiveDate, today: NaiveDate, thresholds: &Thresholds) -> Option<Trigger> {
    let days_left = days_left(expires_on, today);
    if days_left < 0 || thresholds.contains(days_left) {
        Some(Trigger {
            days_left,
            stage: Stage::of(days_left),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn days_left_is_exact_and_signed() {
        let t = today();
        assert_eq!(days_left(t + Duration::days(30), t), 30);
        assert_eq!(days_left(t, t), 0);
        assert_eq!(days_left(t - Duration::days(3), t), -3);
        // across a month boundary and a leap day
        let t = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        assert_eq!(days_left(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), t), 2);
    }

    #[test]
    fn fires_exactly_on_threshold_days() {
        let thresholds = Thresholds::default();
        let t = today();
        for offset in 0..=40 {
            let fired = evaluate(t + Duration::days(offset), t, &thresholds).is_some();
            let expected = [30, 15, 7, 4, 1, 0].contains(&offset);
            assert_eq!(fired, expected, "offset {offset}");
        }
    }

    #[test]
    fn every_overdue_day_fires() {
        let thresholds = Thresholds::default();
        let t = today();
        for offset in 1..=400 {
            let trigger = evaluate(t - Duration::days(offset), t, &thresholds).expect("overdue fires");
            assert_eq!(trigger.days_left, -offset);
            assert_eq!(trigger.stage, Stage::Overdue);
        }
    }

    #[test]
    fn classification_follows_sign() {
        let thresholds = Thresholds::default();
        let t = today();
        assert_eq!(
            evaluate(t + Duration::days(7), t, &thresholds).map(|x| x.stage),
            Some(Stage::Upcoming)
        );
        assert_eq!(evaluate(t, t, &thresholds).map(|x| x.stage), Some(Stage::DueToday));
    }

    #[test]
    fn due_today_needs_zero_threshold() {
        let thresholds = Thresholds::new([30, 15, 7, 4, 1]).unwrap();
        let t = today();
        assert!(evaluate(t, t, &thresholds).is_none());
        assert!(evaluate(t - Duration::days(1), t, &thresholds).is_some());
    }

    #[test]
    fn negative_threshold_rejected() {
        assert!(matches!(
            Thresholds::new([7, -1]),
            Err(ReminderError::InvalidThreshold(-1))
        ));
    }
}
