//! `fleetwatch-reminder`: expiration triggers and at-most-once notification.
//!
//! # Overview
//!
//! A pass reads the fleet sheet into a [`fleet::FleetTable`], then for every
//! (vehicle, document) cell the [`engine::ReminderEngine`] normalizes the
//! date, asks [`trigger::evaluate`] whether it fires today, filters it
//! through the [`ledger`], composes the mail and dispatches it.
//!
//! # Firing rule
//!
//! | days left        | fires                     | stage      |
//! |------------------|---------------------------|------------|
//! | in thresholds    | once per threshold        | `Upcoming` |
//! | 0 (if listed)    | once                      | `DueToday` |
//! | negative         | every day until resolved  | `Overdue`  |

pub mod compose;
pub mod date;
pub mod engine;
pub mod error;
pub mod fleet;
pub mod ledger;
pub mod source;
pub mod trigger;
pub mod types;

pub use engine::ReminderEngine;
pub use error::{ReminderError, Result};
pub use fleet::{FleetSchema, FleetTable};
pub use ledger::{DedupGuard, Ledger};
pub use source::FleetSource;
pub use trigger::Thresholds;
pub use types::{ExpirationEvent, FleetRecord, NotificationKey, PassSummary, Stage};
