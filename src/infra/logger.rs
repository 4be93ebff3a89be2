// ============================================================
// Layer 6 — Model Logger
// ============================================================
// Every model instance carries its own logger, configured from
// its ModelConfig:
//
//   scope_name — attached to every event as the `scope` field
//   log_level  — messages above this verbosity are dropped
//                before they reach tracing
//   log_file   — optional plain-text mirror of every message
//                that passes the level check, written by a
//                fmt subscriber owned by this logger
//
// Events still go through the global tracing subscriber, so
// RUST_LOG filtering applies on top of the per-model level.
// The mirror's subscriber is only installed for the duration
// of one event, so it sees this model's messages and no others.

use anyhow::{Context, Result};
use std::{fs::File, io::Write, path::Path, sync::Arc};
use tracing::Dispatch;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt};

use crate::domain::config::{LogLevel, ModelConfig};

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn  => LevelFilter::WARN,
        LogLevel::Info  => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

fn emit(level: LogLevel, scope: &str, message: &str) {
    match level {
        LogLevel::Error => tracing::error!(scope, "{message}"),
        LogLevel::Warn  => tracing::warn!(scope, "{message}"),
        LogLevel::Info  => tracing::info!(scope, "{message}"),
        LogLevel::Debug => tracing::debug!(scope, "{message}"),
        LogLevel::Trace => tracing::trace!(scope, "{message}"),
    }
}

/// A private subscriber writing plain-text events to one file.
struct FileMirror {
    dispatch: Dispatch,
    file:     Arc<File>,
}

impl FileMirror {
    fn open(path: &Path, level: LogLevel) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = Arc::new(
            File::create(path).with_context(|| format!("Cannot open log file '{}'", path.display()))?,
        );

        let subscriber = tracing_subscriber::registry()
            .with(level_filter(level))
            .with(
                fmt::layer()
                    .with_writer(Arc::clone(&file))
                    .with_ansi(false)
                    .with_target(false),
            );
        Ok(Self { dispatch: Dispatch::new(subscriber), file })
    }
}

pub struct ModelLogger {
    scope:  String,
    level:  LogLevel,
    mirror: Option<FileMirror>,
}

impl ModelLogger {
    /// Open a logger. An existing log file is truncated.
    pub fn new(scope: &str, level: LogLevel, log_file: Option<&Path>) -> Result<Self> {
        let mirror = log_file.map(|path| FileMirror::open(path, level)).transpose()?;
        Ok(Self { scope: scope.to_string(), level, mirror })
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        Self::new(&config.scope_name, config.log_level, config.log_file.as_deref())
    }

    /// Logger that never touches the filesystem. Used when
    /// construction failed before a real logger existed.
    pub fn error_only() -> Self {
        let config = ModelConfig::error_only();
        Self { scope: config.scope_name, level: config.log_level, mirror: None }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }

    pub fn log(&mut self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }

        emit(level, &self.scope, message);

        if let Some(mirror) = &self.mirror {
            tracing::dispatcher::with_default(&mirror.dispatch, || emit(level, &self.scope, message));
        }
    }

    pub fn error(&mut self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&mut self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&mut self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(mirror) = &self.mirror {
            (&*mirror.file).flush().context("Failed to flush model log file")?;
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_level_threshold() {
        let logger = ModelLogger::new("m", LogLevel::Info, None).unwrap();
        assert!(logger.enabled(LogLevel::Error));
        assert!(logger.enabled(LogLevel::Info));
        assert!(!logger.enabled(LogLevel::Debug));
    }

    #[test]
    fn test_file_mirror_respects_level() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs").join("model.log");

        let mut logger = ModelLogger::new("vae", LogLevel::Warn, Some(&path)).unwrap();
        logger.info("hidden");
        logger.warn("shown");
        logger.flush().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("WARN"));
        assert!(text.contains("shown"));
        assert!(text.contains("vae"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn test_error_only_logger() {
        let logger = ModelLogger::error_only();
        assert_eq!(logger.scope(), "");
        assert_eq!(logger.level(), LogLevel::Error);
    }
}
