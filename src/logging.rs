//! Tracing setup.
//!
//! The dashboard owns the terminal, so nothing is ever logged to stdout or
//! stderr. Logging is enabled only when a log file is configured; the level
//! defaults to `info` and can be changed with `RUST_LOG`.

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::non_blocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

/// Install a file subscriber when `log_file` is set.
///
/// The returned guard flushes buffered lines on drop and must be held
/// until the program exits.
pub fn init(log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let Some(path) = log_file else {
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log file has no name"))?;
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .map_err(io::Error::other)?;
    let (writer, guard) = non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_target(true).with_writer(writer))
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_log_file_installs_nothing() {
        assert!(init(None).unwrap().is_none());
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        let err = init(Some(Path::new("/"))).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn unopenable_log_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init(Some(dir.path())).is_err());
    }
}
