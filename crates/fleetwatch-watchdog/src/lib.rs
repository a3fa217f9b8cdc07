//! `fleetwatch-watchdog`: is the daily reminder still running?
//!
//! [`Watchdog::check`] runs on an hourly schedule. After the expected local
//! hour plus a grace window it looks for a successful run of the reminder
//! workflow since local midnight and mails one alert if there is none.
//!
//! [`FailureReport`] is the companion notice CI sends when the reminder job
//! itself fails, carrying the tail of the diagnostic log.

pub mod alert;
pub mod engine;
pub mod error;
pub mod failure;
pub mod history;
pub mod tail;
pub mod types;
pub mod window;

pub use engine::{find_qualifying_run, Watchdog};
pub use error::{Result, WatchdogError};
pub use failure::FailureReport;
pub use history::{GitHubRunHistory, RunHistory};
pub use tail::tail_text;
pub use types::{RunSummary, Verdict};
pub use window::CheckWindow;
