use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    value::Uncased,
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, Result};

pub const CONFIG_ENV: &str = "FLEETWATCH_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "fleetwatch.toml";
pub const DEFAULT_SMTP_HOST: &str = "smtp.office365.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_TIMEZONE: &str = "Europe/Bucharest";
pub const DEFAULT_THRESHOLDS: [i64; 6] = [30, 15, 7, 4, 1, 0];
pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const GITHUB_SERVER_URL: &str = "https://github.com";

/// Flat variable names exported by the CI workflows, mapped onto config keys.
///
/// These sit on top of every other source so the deployed secrets keep
/// working without a TOML file.
const CI_ENV_KEYS: &[(&str, &str)] = &[
    ("SENDER_EMAIL", "mail.sender"),
    ("APP_PASSWORD", "mail.password"),
    ("DEST_EMAIL", "mail.recipient"),
    ("SMTP_HOST", "mail.host"),
    ("SMTP_PORT", "mail.port"),
    ("GSHEET_CSV_URL", "fleet.source_url"),
    ("TARGET_LOCAL_TZ", "timezone"),
    ("TARGET_LOCAL_HOUR", "watchdog.expected_hour"),
    ("WATCH_WORKFLOW_FILE", "watchdog.workflow"),
    ("WATCH_GRACE_MIN", "watchdog.grace_minutes"),
    ("WATCH_FORCE_TEST", "watchdog.force_test"),
    ("GITHUB_TOKEN", "watchdog.token"),
    ("GITHUB_REPOSITORY", "watchdog.repository"),
    ("GITHUB_WORKFLOW", "failure.workflow"),
    ("GITHUB_RUN_ID", "failure.run_id"),
    ("GITHUB_SERVER_URL", "failure.server_url"),
    ("LOG_PATH", "log.path"),
];

/// Which command is about to run; decides which settings are mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Reminder,
    Watchdog,
    FailureNotice,
}

/// Top-level config (fleetwatch.toml + FLEETWATCH_* and CI env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetwatchConfig {
    /// IANA zone used for "today" and for the watchdog's expected hour.
    pub timezone: String,
    pub mail: MailConfig,
    pub fleet: FleetConfig,
    pub ledger: LedgerConfig,
    pub watchdog: WatchdogConfig,
    pub failure: FailureConfig,
    pub log: LogConfig,
}

impl Default for FleetwatchConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            mail: MailConfig::default(),
            fleet: FleetConfig::default(),
            ledger: LedgerConfig::default(),
            watchdog: WatchdogConfig::default(),
            failure: FailureConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    #[serde(deserialize_with = "deserialize_opt_text")]
    pub sender: Option<String>,
    /// App password for the sender's mailbox. Never logged.
    #[serde(deserialize_with = "deserialize_opt_text")]
    pub password: Option<String>,
    /// Defaults to `sender` when unset.
    #[serde(deserialize_with = "deserialize_opt_text")]
    pub recipient: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: None,
            password: None,
            recipient: None,
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            timeout_secs: 30,
        }
    }
}

impl MailConfig {
    pub fn sender(&self) -> Option<&str> {
        non_empty(&self.sender)
    }

    pub fn password(&self) -> Option<&str> {
        non_empty(&self.password)
    }

    pub fn recipient(&self) -> Option<&str> {
        non_empty(&self.recipient).or_else(|| self.sender())
    }
}

/// One expiration-date column of the fleet sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentColumn {
    /// Header name, matched case-insensitively.
    pub column: String,
    /// Label used in messages and dedup keys, e.g. `"itp"`.
    pub label: String,
    /// When true the run aborts if the column is absent.
    #[serde(default)]
    pub required: bool,
}

impl DocumentColumn {
    pub fn new(column: &str, label: &str, required: bool) -> Self {
        Self {
            column: column.to_string(),
            label: label.to_string(),
            required,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Published-sheet CSV URL. Takes precedence over `csv_path`.
    #[serde(deserialize_with = "deserialize_opt_text")]
    pub source_url: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub csv_path: String,
    pub id_column: String,
    pub label_column: String,
    pub documents: Vec<DocumentColumn>,
    /// Extra columns ending in this suffix activate a document type named
    /// after the column's prefix. `None` disables discovery.
    pub discover_suffix: Option<String>,
    /// Days-before-expiry at which a reminder fires.
    pub thresholds: Vec<i64>,
    pub timeout_secs: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            csv_path: "camioane.csv".to_string(),
            id_column: "nr_masina".to_string(),
            label_column: "marca".to_string(),
            documents: vec![
                DocumentColumn::new("rovinieta_expira", "rovinieta", true),
                DocumentColumn::new("itp_expira", "itp", false),
                DocumentColumn::new("asigurare_expira", "asigurare", false),
            ],
            discover_suffix: Some("_expira".to_string()),
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            timeout_secs: 30,
        }
    }
}

impl FleetConfig {
    pub fn source_url(&self) -> Option<&str> {
        non_empty(&self.source_url)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Csv,
            path: "sent_log.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// `owner/repo` hosting the monitored workflow.
    #[serde(deserialize_with = "deserialize_opt_text")]
    pub repository: Option<String>,
    /// Workflow file name or numeric id, e.g. `run-reminder.yml`.
    #[serde(deserialize_with = "deserialize_text")]
    pub workflow: String,
    #[serde(deserialize_with = "deserialize_opt_text")]
    pub token: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub api_base: String,
    /// Local hour by which the reminder run should have completed.
    pub expected_hour: u32,
    pub grace_minutes: u32,
    pub per_page: u32,
    pub timeout_secs: u64,
    /// Skip every check and send a test alert.
    #[serde(deserialize_with = "deserialize_flag")]
    pub force_test: bool,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            repository: None,
            workflow: "run-reminder.yml".to_string(),
            token: None,
            api_base: GITHUB_API_BASE.to_string(),
            expected_hour: 8,
            grace_minutes: 90,
            per_page: 20,
            timeout_secs: 20,
            force_test: false,
        }
    }
}

impl WatchdogConfig {
    pub fn repository(&self) -> Option<&str> {
        non_empty(&self.repository)
    }

    pub fn token(&self) -> Option<&str> {
        non_empty(&self.token)
    }
}

/// Context for the failure notice sent when the reminder workflow fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    #[serde(deserialize_with = "deserialize_opt_text")]
    pub workflow: Option<String>,
    pub run_id: Option<u64>,
    #[serde(deserialize_with = "deserialize_text")]
    pub server_url: String,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            workflow: None,
            run_id: None,
            server_url: GITHUB_SERVER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Diagnostic log written by every command and tailed by the failure notice.
    #[serde(deserialize_with = "deserialize_text")]
    pub path: String,
    pub tail_lines: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: "app.log".to_string(),
            tail_lines: 120,
        }
    }
}

impl FleetwatchConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// File lookup order:
    ///   1. Explicit path argument
    ///   2. `$FLEETWATCH_CONFIG`
    ///   3. `./fleetwatch.toml`
    ///
    /// A missing file is not an error; defaults and env vars still apply.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let config: FleetwatchConfig = Self::figment(&path)
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        Ok(config)
    }

    /// The layered provider stack, lowest precedence first.
    pub fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("FLEETWATCH_").split("__"))
            .merge(ci_env())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| CoreError::Timezone(self.timezone.clone()))
    }

    /// Names of the mandatory settings that are unset for `purpose`.
    pub fn missing_for(&self, purpose: Purpose) -> Vec<String> {
        let mut missing = Vec::new();
        if self.mail.sender().is_none() {
            missing.push(setting_name("mail.sender"));
        }
        if self.mail.password().is_none() {
            missing.push(setting_name("mail.password"));
        }
        if purpose == Purpose::Watchdog && !self.watchdog.force_test {
            if self.watchdog.repository().is_none() {
                missing.push(setting_name("watchdog.repository"));
            }
            if self.watchdog.token().is_none() {
                missing.push(setting_name("watchdog.token"));
            }
            if self.watchdog.workflow.trim().is_empty() {
                missing.push(setting_name("watchdog.workflow"));
            }
        }
        missing
    }

    /// Check everything `purpose` needs before any work starts.
    ///
    /// Missing and out-of-range settings are collected into one
    /// [`CoreError::Settings`] instead of failing on the first.
    pub fn validate_for(&self, purpose: Purpose) -> Result<()> {
        let mut problems: Vec<String> = self
            .missing_for(purpose)
            .into_iter()
            .map(|name| format!("missing {name}"))
            .collect();

        if let Err(e) = self.tz() {
            problems.push(e.to_string());
        }

        match purpose {
            Purpose::Reminder => {
                let fleet = &self.fleet;
                if fleet.id_column.trim().is_empty() {
                    problems.push("fleet.id_column must not be empty".to_string());
                }
                if !fleet.documents.iter().any(|d| d.required) {
                    problems.push("fleet.documents needs at least one required column".to_string());
                }
                if let Some(t) = fleet.thresholds.iter().find(|t| **t < 0) {
                    problems.push(format!("fleet.thresholds must be >= 0 (got {t})"));
                }
                if fleet.source_url().is_none() && fleet.csv_path.trim().is_empty() {
                    problems.push(format!("missing {}", setting_name("fleet.source_url")));
                }
            }
            Purpose::Watchdog => {
                let wd = &self.watchdog;
                if wd.expected_hour > 23 {
                    problems.push(format!(
                        "watchdog.expected_hour must be 0..=23 (got {})",
                        wd.expected_hour
                    ));
                }
                if !(1..=100).contains(&wd.per_page) {
                    problems.push(format!(
                        "watchdog.per_page must be 1..=100 (got {})",
                        wd.per_page
                    ));
                }
            }
            Purpose::FailureNotice => {}
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Settings(problems))
        }
    }
}

/// `"mail.sender"` → `"mail.sender (SENDER_EMAIL)"`, so operators can find
/// the setting whichever way they configure it.
fn setting_name(key: &str) -> String {
    match CI_ENV_KEYS.iter().find(|(_, path)| *path == key) {
        Some((env, _)) => format!("{key} ({env})"),
        None => key.to_string(),
    }
}

fn ci_env() -> Env {
    let names: Vec<&str> = CI_ENV_KEYS.iter().map(|(env, _)| *env).collect();
    Env::raw().only(&names).map(|key| {
        let mapped = CI_ENV_KEYS
            .iter()
            .find(|(env, _)| key.as_str().eq_ignore_ascii_case(env))
            .map(|(_, path)| path.to_string())
            .unwrap_or_else(|| key.as_str().to_string());
        Uncased::from(mapped)
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts `true`/`false` as well as the `1`/`0`/`yes`/`no` spellings CI
/// variables tend to use.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Text(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
    })
}

/// A scalar setting as figment hands it over. Env values that look like
/// numbers arrive as numbers, so text settings take them back as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    UInt(u64),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::UInt(n) => n.to_string(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(Scalar::into_text)
}

fn deserialize_opt_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_text))
}
