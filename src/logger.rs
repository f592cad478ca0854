use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// Install the global tracing subscriber: env-filterable stderr output,
/// plus a daily-rolling log file when `log_dir` is given.
///
/// `RUST_LOG` wins over `log_level`. Returns the file appender guard; keep
/// it alive for as long as logs should be flushed.
pub fn init_tracing(log_dir: Option<PathBuf>, log_level: &str) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "node-red-extension.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn installs_subscriber_and_file_appender() {
        let dir = TempDir::new().unwrap();
        let guard = init_tracing(Some(dir.path().to_path_buf()), "debug").unwrap();
        assert!(guard.is_some());
        tracing::info!("logger smoke test");

        // a second install must fail instead of silently replacing
        assert!(init_tracing(None, "info").is_err());
    }
}
