//! Client log events.
//!
//! Applies the enabled [`LogLevel`] categories from the client configuration:
//! a disabled category emits nothing.

use crate::config::{ErrorFormat, LogLevel, LogLevels};
use crate::error::DbError;
use std::time::Duration;
use tracing::{error, info, warn};

pub const QUERY_TARGET: &str = "bot_dbms::query";
pub const CLIENT_TARGET: &str = "bot_dbms::client";

#[derive(Debug, Clone)]
pub struct EventLogger {
    levels: LogLevels,
    error_format: ErrorFormat,
}

impl EventLogger {
    pub fn new(levels: LogLevels, error_format: ErrorFormat) -> Self {
        Self {
            levels,
            error_format,
        }
    }

    /// Logger with every category disabled.
    pub fn silent() -> Self {
        Self::new(LogLevels::none(), ErrorFormat::Minimal)
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.levels.is_enabled(level)
    }

    pub fn levels(&self) -> &LogLevels {
        &self.levels
    }

    pub fn error_format(&self) -> ErrorFormat {
        self.error_format
    }

    /// Returns whether the event was emitted.
    pub fn query(&self, sql: &str, param_count: usize, elapsed: Duration) -> bool {
        if !self.is_enabled(LogLevel::Query) {
            return false;
        }
        info!(
            target: QUERY_TARGET,
            sql = %sql,
            params = param_count,
            duration_ms = elapsed.as_millis() as u64,
            "query"
        );
        true
    }

    pub fn info(&self, message: &str) -> bool {
        if !self.is_enabled(LogLevel::Info) {
            return false;
        }
        info!(target: CLIENT_TARGET, "{}", message);
        true
    }

    pub fn warn(&self, message: &str) -> bool {
        if !self.is_enabled(LogLevel::Warn) {
            return false;
        }
        warn!(target: CLIENT_TARGET, "{}", message);
        true
    }

    /// Log a failed operation, rendered with the configured error format.
    pub fn error(&self, err: &DbError) -> bool {
        if !self.is_enabled(LogLevel::Error) {
            return false;
        }
        error!(target: CLIENT_TARGET, "{}", err.render(self.error_format));
        true
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new(LogLevels::all(), ErrorFormat::default())
    }
}
