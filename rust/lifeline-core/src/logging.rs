// rust/lifeline-core/src/logging.rs
// Tracing setup: stderr sink always, optional rotating JSON file sink

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogRotation, LoggingConfig};

/// Log level names accepted in `LOG_LEVEL`.
///
/// SUCCESS and CRITICAL have no tracing equivalent and collapse to INFO and
/// ERROR respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info | LogLevel::Success => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "SUCCESS" => Ok(LogLevel::Success),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            other => Err(format!("unsupported log level: {other}")),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Install the global tracing subscriber.
///
/// The returned guard keeps the non-blocking file writer alive; the caller
/// must hold it for the process lifetime when file logging is enabled.
pub fn setup_logging(
    level: LogLevel,
    config: &LoggingConfig,
) -> Result<Option<WorkerGuard>, std::io::Error> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.level_filter().into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = if config.enable_file_logging {
        std::fs::create_dir_all(&config.log_dir)?;
        prune_old_logs(&config.log_dir, config.retention_days);
        let appender = match config.rotation {
            LogRotation::Daily => rolling::daily(&config.log_dir, "lifeline.log"),
            LogRotation::Hourly => rolling::hourly(&config.log_dir, "lifeline.log"),
            LogRotation::Never => rolling::never(&config.log_dir, "lifeline.log"),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer().json().with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Delete rotated log files older than the retention window. Best-effort:
/// an unreadable entry is skipped, never an error.
fn prune_old_logs(dir: &Path, retention_days: u32) {
    let cutoff = Duration::from_secs(u64::from(retention_days) * 24 * 60 * 60);
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), %err, "skipping log retention sweep");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let expired = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|age| age >= cutoff)
            .unwrap_or(false);
        if expired {
            if let Err(err) = std::fs::remove_file(&path) {
                debug!(file = %path.display(), %err, "failed to prune log file");
            }
        }
    }
}
