use std::{sync::Arc, time::Duration};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use fleetwatch_core::{config::LogConfig, FleetwatchConfig};
use fleetwatch_mail::{Mailer, SmtpMailer, SmtpSettings};
use fleetwatch_reminder::{ledger, FleetSchema, FleetSource, FleetTable, ReminderEngine, Thresholds};
use fleetwatch_watchdog::{FailureReport, GitHubRunHistory, Watchdog};
use tracing::{error, info};

mod cli;
mod logging;

use cli::{Cli, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // config first: the log file location comes from it
    let loaded = FleetwatchConfig::load(cli.config.as_deref());
    let log_path = match &loaded {
        Ok(cfg) => cfg.log.path.clone(),
        Err(_) => LogConfig::default().path,
    };
    let _log_guard = logging::init(cli.command.writes_log().then_some(log_path.as_str()));

    let mut config = loaded.context("failed to load configuration")?;
    if let Command::Watchdog { force_test: true } = cli.command {
        config.watchdog.force_test = true;
    }

    let purpose = cli.command.purpose();
    if let Err(e) = config.validate_for(purpose) {
        error!(code = e.code(), ?purpose, "{e}");
        return Err(e).context("configuration rejected");
    }

    let mailer = build_mailer(&config)?;
    let recipient = config
        .mail
        .recipient()
        .context("mail.recipient is not set")?
        .to_string();

    match cli.command {
        Command::Remind { today, dry_run } => {
            remind(&config, mailer, &recipient, today, dry_run).await
        }
        Command::Watchdog { .. } => watchdog(&config, mailer, &recipient).await,
        Command::NotifyFailure => notify_failure(&config, mailer.as_ref(), &recipient).await,
    }
}

fn build_mailer(config: &FleetwatchConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    let settings = SmtpSettings::from_config(&config.mail).context("incomplete mail settings")?;
    info!(host = %settings.host, port = settings.port, "smtp relay configured");
    let mailer = SmtpMailer::new(settings).context("failed to set up smtp transport")?;
    Ok(Arc::new(mailer))
}

async fn remind(
    config: &FleetwatchConfig,
    mailer: Arc<dyn Mailer>,
    recipient: &str,
    today: Option<NaiveDate>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let tz = config.tz()?;
    let today = today.unwrap_or_else(|| Utc::now().with_timezone(&tz).date_naive());
    info!(%today, %tz, dry_run, "reminder run starting");

    let thresholds = Thresholds::new(config.fleet.thresholds.iter().copied())?;
    let source = FleetSource::from_config(&config.fleet);
    let text = source
        .fetch(Duration::from_secs(config.fleet.timeout_secs))
        .await
        .context("could not load fleet sheet")?;
    let table = FleetTable::parse(&text, &FleetSchema::from_config(&config.fleet))
        .context("fleet sheet rejected")?;

    let ledger = ledger::open(&config.ledger).context("could not open ledger")?;
    let mut engine =
        ReminderEngine::new(thresholds, ledger, mailer, recipient, tz).dry_run(dry_run);
    let summary = engine
        .run(&table, today)
        .await
        .context("reminder pass aborted")?;

    info!(%summary, "reminder run finished");
    Ok(())
}

async fn watchdog(
    config: &FleetwatchConfig,
    mailer: Arc<dyn Mailer>,
    recipient: &str,
) -> anyhow::Result<()> {
    let tz = config.tz()?;
    let history = GitHubRunHistory::from_config(&config.watchdog)
        .or_else(|e| {
            // a forced test never reaches the history, so the github settings may be blank
            if config.watchdog.force_test {
                GitHubRunHistory::new(
                    &config.watchdog.api_base,
                    config.watchdog.repository().unwrap_or("-"),
                    &config.watchdog.workflow,
                    "",
                    config.watchdog.per_page,
                    Duration::from_secs(config.watchdog.timeout_secs),
                )
            } else {
                Err(e)
            }
        })
        .context("could not set up run history client")?;
    info!(endpoint = history.endpoint(), "run history source");

    let watchdog = Watchdog::new(&config.watchdog, tz, Arc::new(history), mailer, recipient);
    let verdict = watchdog.check(Utc::now()).await?;
    info!(%verdict, "watchdog finished");
    Ok(())
}

async fn notify_failure(
    config: &FleetwatchConfig,
    mailer: &dyn Mailer,
    recipient: &str,
) -> anyhow::Result<()> {
    let report = FailureReport::gather(config);
    info!(workflow = %report.workflow, run = %report.run_url, "sending failure notice");
    report
        .send(mailer, recipient)
        .await
        .context("failure notice could not be sent")?;
    Ok(())
}
