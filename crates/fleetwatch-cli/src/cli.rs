use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fleetwatch_core::Purpose;

/// Fleet document expiration reminders and their liveness watchdog.
#[derive(Parser, Debug)]
#[command(name = "fleetwatch", version)]
pub struct Cli {
    /// TOML config file (default: $FLEETWATCH_CONFIG, then ./fleetwatch.toml).
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Check the fleet sheet and mail due reminders.
    Remind {
        /// Evaluate as of this day (YYYY-MM-DD) instead of today.
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Compose and log, but do not send or record anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Alert if the reminder workflow has not succeeded today.
    Watchdog {
        /// Send a test message without checking anything.
        #[arg(long)]
        force_test: bool,
    },

    /// Mail the failure notice with the tail of the diagnostic log.
    NotifyFailure,
}

impl Command {
    pub fn purpose(&self) -> Purpose {
        match self {
            Command::Remind { .. } => Purpose::Reminder,
            Command::Watchdog { .. } => Purpose::Watchdog,
            Command::NotifyFailure => Purpose::FailureNotice,
        }
    }

    /// Whether this command writes the diagnostic log. The failure notice
    /// only reads it.
    pub fn writes_log(&self) -> bool {
        !matches!(self, Command::NotifyFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remind_with_day_override() {
        let cli = Cli::try_parse_from([
            "fleetwatch",
            "--config",
            "ops.toml",
            "remind",
            "--today",
            "2025-03-27",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("ops.toml"));
        assert_eq!(
            cli.command,
            Command::Remind {
                today: NaiveDate::from_ymd_opt(2025, 3, 27),
                dry_run: true,
            }
        );
        assert_eq!(cli.command.purpose(), Purpose::Reminder);
    }

    #[test]
    fn bad_day_is_rejected() {
        assert!(Cli::try_parse_from(["fleetwatch", "remind", "--today", "27/03/2025"]).is_err());
    }

    #[test]
    fn watchdog_and_failure_notice() {
        let cli = Cli::try_parse_from(["fleetwatch", "watchdog", "--force-test"]).unwrap();
        assert_eq!(cli.command, Command::Watchdog { force_test: true });
        assert!(cli.command.writes_log());

        let cli = Cli::try_parse_from(["fleetwatch", "notify-failure", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.command, Command::NotifyFailure);
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
        assert!(!cli.command.writes_log());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["fleetwatch"]).is_err());
    }
}
