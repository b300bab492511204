//! Logging Init (component C13).
//!
//! Process-wide `tracing` subscriber setup, driven by `LOG_LEVEL`,
//! `ENABLE_FILE_LOGGING` and `LOG_FILE_PATH`. Called once from each
//! binary's `main` before anything else runs.

use std::path::Path;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Handle kept alive for the lifetime of the process so the non-blocking
/// file-logging writer keeps flushing; dropping it silently stops log
/// delivery.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize the global `tracing` subscriber from the recognized
/// environment variables. `LOG_LEVEL` defaults to `info` when unset or
/// unparseable; `ENABLE_FILE_LOGGING=true` attaches a rotating file layer
/// rooted at `LOG_FILE_PATH` (default `./codepulse.log`).
pub fn init_from_env() -> crate::Result<LoggingGuard> {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into())))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = fmt::layer().with_target(true).with_ansi(true);

    let file_enabled = std::env::var("ENABLE_FILE_LOGGING")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if file_enabled {
        let log_path = std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "codepulse.log".into());
        let path = Path::new(&log_path);
        let (dir, file_name) = split_log_path(path);
        if let Some(dir) = &dir {
            std::fs::create_dir_all(dir)?;
        }
        let file_appender = tracing_appender::rolling::daily(dir.unwrap_or_else(|| ".".into()), file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| crate::UtilError::Config(format!("failed to initialize logging: {e}")))?;

        return Ok(LoggingGuard {
            _file_guard: Some(guard),
        });
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| crate::UtilError::Config(format!("failed to initialize logging: {e}")))?;

    Ok(LoggingGuard { _file_guard: None })
}

fn split_log_path(path: &Path) -> (Option<std::path::PathBuf>, String) {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).map(Path::to_path_buf);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "codepulse.log".to_string());
    (dir, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_log_path_into_dir_and_file() {
        let (dir, name) = split_log_path(Path::new("/var/log/codepulse/app.log"));
        assert_eq!(dir, Some(std::path::PathBuf::from("/var/log/codepulse")));
        assert_eq!(name, "app.log");
    }

    #[test]
    fn bare_filename_has_no_dir() {
        let (dir, name) = split_log_path(Path::new("app.log"));
        assert_eq!(dir, None);
        assert_eq!(name, "app.log");
    }
}
