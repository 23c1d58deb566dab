//! Tracing subscriber installation

use crate::config::LoggingConfig;
use crate::error::{CloudPipeError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of rotated log files
pub const LOG_FILE_PREFIX: &str = "cloudpipe.log";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured filter. With a log directory the
/// output goes to a daily-rotated file through a background writer; keep the
/// returned guard alive until exit so buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .try_init()
                .map_err(|e| {
                    CloudPipeError::Config(format!("Failed to initialize logging: {}", e))
                })?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(config.ansi)
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .map_err(|e| {
                    CloudPipeError::Config(format!("Failed to initialize logging: {}", e))
                })?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so both
    // outcomes are covered in a single test.
    #[test]
    fn test_second_init_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: Some(dir.path().to_path_buf()),
            ..LoggingConfig::default()
        };

        let first = init(&config);
        let second = init(&LoggingConfig::default());

        assert!(first.unwrap().is_some());
        assert!(matches!(second, Err(CloudPipeError::Config(_))));
    }
}
