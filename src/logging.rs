//! Log output: stdout plus a daily rolling file under the configured logs directory.

use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;
use crate::error::AppError;

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "outage_bot=info";
const LOG_FILE_PREFIX: &str = "outage-bot";
const KEPT_LOG_FILES: usize = 7;

/// Installs the global log subscriber.
///
/// The returned guard flushes the file writer when dropped, so keep it alive until shutdown.
pub fn setup_logging(config: &Config) -> Result<WorkerGuard, AppError> {
    let (file_writer, guard) = file_writer(config)?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout).with_ansi(true))
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| AppError::ConfigurationError {
            msg: format!("Failed to install log subscriber: {e}"),
        })?;

    Ok(guard)
}

fn file_writer(config: &Config) -> Result<(NonBlocking, WorkerGuard), AppError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(KEPT_LOG_FILES)
        .build(&config.logs_path)
        .map_err(|e| AppError::ConfigurationError {
            msg: format!(
                "Cannot write logs to '{}': {e}",
                config.logs_path.display()
            ),
        })?;
    Ok(tracing_appender::non_blocking(appender))
}
