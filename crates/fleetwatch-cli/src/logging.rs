use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::Context;
use tracing::warn;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Matches every fleetwatch_* target.
const DEFAULT_FILTER: &str = "fleetwatch=info";

/// Size past which the log file is shifted to `<path>.1` at startup.
pub const MAX_LOG_BYTES: u64 = 1024 * 1024;
/// Number of shifted copies kept next to the live file.
pub const KEPT_LOGS: usize = 3;

/// Install the stderr subscriber and, when `log_file` is given, a plain-text
/// copy in that file. Keep the returned guard alive until exit or buffered
/// lines are lost.
///
/// A log file that cannot be opened is reported on stderr and the run goes
/// on without it.
pub fn init(log_file: Option<&str>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr = fmt::layer().with_writer(io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return None;
    };

    let rotated = rotate_if_large(Path::new(path), MAX_LOG_BYTES, KEPT_LOGS);
    match file_appender(Path::new(path)) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            if let Err(e) = rotated {
                warn!(path, error = %e, "could not rotate log file, appending to it");
            }
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            warn!(path, error = format!("{e:#}"), "cannot open log file, logging to stderr only");
            None
        }
    }
}

/// Appender that always writes to exactly `path`; the failure notifier
/// tails that name.
pub fn file_appender(path: &Path) -> anyhow::Result<RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log path {} has no file name", path.display()))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy().into_owned())
        .build(dir)
        .with_context(|| format!("cannot open log file {}", path.display()))
}

/// Shift `path` to `path.1` (and `.1` to `.2`, ...) when it has grown past
/// `max_bytes`, dropping the copy beyond `keep`. Returns whether a shift
/// happened.
pub fn rotate_if_large(path: &Path, max_bytes: u64, keep: usize) -> io::Result<bool> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > max_bytes => {}
        Ok(_) => return Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }

    if keep == 0 {
        std::fs::remove_file(path)?;
        return Ok(true);
    }

    let oldest = backup_path(path, keep);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }
    for n in (1..keep).rev() {
        let from = backup_path(path, n);
        if from.exists() {
            std::fs::rename(&from, backup_path(path, n + 1))?;
        }
    }
    std::fs::rename(path, backup_path(path, 1))?;
    Ok(true)
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appender_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("app.log");

        assert!(file_appender(&path).is_ok());
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn unusable_log_path_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "plain file").unwrap();

        let err = file_appender(&blocker.join("app.log")).unwrap_err();
        assert!(err.to_string().contains("cannot create log directory"));
    }

    #[test]
    fn small_log_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "short\n").unwrap();

        assert!(!rotate_if_large(&path, 1024, 3).unwrap());
        assert!(path.exists());
        assert!(!dir.path().join("app.log.1").exists());
    }

    #[test]
    fn missing_log_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!rotate_if_large(&dir.path().join("app.log"), 10, 3).unwrap());
    }

    #[test]
    fn large_log_shifts_and_oldest_copy_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let copy = |n: usize| dir.path().join(format!("app.log.{n}"));

        std::fs::write(copy(1), "older").unwrap();
        std::fs::write(copy(2), "oldest").unwrap();
        std::fs::write(&path, "x".repeat(64)).unwrap();

        assert!(rotate_if_large(&path, 10, 2).unwrap());
        assert!(!path.exists());
        assert_eq!(std::fs::read_to_string(copy(1)).unwrap(), "x".repeat(64));
        assert_eq!(std::fs::read_to_string(copy(2)).unwrap(), "older");
        assert!(!copy(3).exists());
    }
}
