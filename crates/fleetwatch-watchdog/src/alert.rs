//! Watchdog mail text.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::types::RunSummary;

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M %Z";

/// What an alert or test message needs to say.
#[derive(Debug, Clone)]
pub struct AlertContext<'a> {
    pub job: &'a str,
    pub expected_hour: u32,
    pub grace_minutes: u32,
    pub tz: Tz,
    pub checked_at: DateTime<Tz>,
}

pub fn missed_run(ctx: &AlertContext<'_>, last_run: Option<&RunSummary>) -> (String, String) {
    let subject = format!("[ALERTA] Reminder bot nu a rulat azi ({})", ctx.job);
    let last = match last_run {
        Some(run) => run.describe(),
        None => "(nicio rulare in lista returnata)".to_string(),
    };
    let body = format!(
        "Nu am gasit o rulare reusita a workflow-ului de azi.\n\n\
         Job: {job}\n\
         Ora asteptata: {hour:02}:00 ({tz})\n\
         Fereastra de gratie: {grace} minute\n\
         Verificat la: {checked}\n\n\
         Ultima rulare: {last}\n",
        job = ctx.job,
        hour = ctx.expected_hour,
        tz = ctx.tz,
        grace = ctx.grace_minutes,
        checked = ctx.checked_at.format(LOCAL_FORMAT),
    );
    (subject, body)
}

pub fn forced_test(ctx: &AlertContext<'_>) -> (String, String) {
    let subject = format!("[TEST] Watchdog reminder bot ({})", ctx.job);
    let body = format!(
        "Mesaj de test trimis de watchdog. Nu s-a verificat istoricul rularilor.\n\n\
         Job: {job}\n\
         Ora asteptata: {hour:02}:00 ({tz})\n\
         Fereastra de gratie: {grace} minute\n\
         Trimis la: {checked}\n",
        job = ctx.job,
        hour = ctx.expected_hour,
        tz = ctx.tz,
        grace = ctx.grace_minutes,
        checked = ctx.checked_at.format(LOCAL_FORMAT),
    );
    (subject, body)
}
