//! Persistent log sink for request/response records.
//!
//! The sink is built once at startup and handed to the engine, which
//! attaches it to every virtual user task. Nothing is installed as the
//! global default subscriber, so several sinks can coexist in one process
//! (tests rely on this).

use std::path::Path;

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::loadtest::config::LoggingSettings;
use crate::loadtest::error::LoadTestError;

/// A tracing dispatcher writing timestamped, leveled lines to a file.
///
/// Keep the sink alive until the run is over: dropping it flushes and
/// closes the background writer.
pub struct LogSink {
    dispatch: Dispatch,
    guard: Option<WorkerGuard>,
}

impl LogSink {
    /// Opens (or creates) the configured log file and builds the dispatcher.
    ///
    /// `RUST_LOG` takes precedence over `settings.level`.
    pub fn init(settings: &LoggingSettings) -> Result<Self, LoadTestError> {
        let path = settings.file.as_path();
        let (dir, file_name) = split_log_path(path)?;
        std::fs::create_dir_all(dir).map_err(|source| LoadTestError::LogSink {
            source,
            path: path.display().to_string(),
        })?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(file_name.to_string_lossy())
            .build(dir)
            .map_err(|e| LoadTestError::LogSink {
                source: std::io::Error::other(e),
                path: path.display().to_string(),
            })?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));
        let subscriber = tracing_subscriber::registry().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false),
        );

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            guard: Some(guard),
        })
    }

    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
            guard: None,
        }
    }

    /// Dispatcher to attach to tasks with
    /// [`tracing::instrument::WithSubscriber::with_subscriber`].
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("enabled", &self.guard.is_some())
            .finish()
    }
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr), LoadTestError> {
    let file_name = path.file_name().ok_or_else(|| LoadTestError::LogSink {
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        path: path.display().to_string(),
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_split_relative_file_name() {
        let (dir, name) = split_log_path(Path::new("run.log")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert_eq!(name, "run.log");
    }

    #[test]
    fn test_split_nested_path() {
        let (dir, name) = split_log_path(Path::new("logs/today/run.log")).unwrap();
        assert_eq!(dir, Path::new("logs/today"));
        assert_eq!(name, "run.log");
    }

    #[test]
    fn test_split_rejects_directory_only_path() {
        assert!(matches!(
            split_log_path(Path::new("/")).unwrap_err(),
            LoadTestError::LogSink { .. }
        ));
    }

    #[test]
    fn test_sink_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("journey.log");
        let settings = LoggingSettings {
            file: file.clone(),
            level: "info".to_string(),
        };

        let sink = LogSink::init(&settings).unwrap();
        tracing::dispatcher::with_default(&sink.dispatch(), || {
            tracing::info!("[POST] /api/v1/auth/guest -> Status: 200");
        });
        drop(sink);

        let content = std::fs::read_to_string(PathBuf::from(&file)).unwrap();
        assert!(content.contains("INFO"), "level missing: {content}");
        assert!(content.contains("/api/v1/auth/guest -> Status: 200"));
    }

    #[test]
    fn test_disabled_sink_debug() {
        let sink = LogSink::disabled();
        assert_eq!(format!("{sink:?}"), "LogSink { enabled: false }");
    }
}
