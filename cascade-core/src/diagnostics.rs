//! Logging sink for host code.
//!
//! Host code logs through [`log`], which forwards to `tracing` and hands the
//! value back so it can be used inline:
//!
//! ```rust
//! use cascade_core::diagnostics::{log, LogLevel};
//!
//! let width = log(640, "resolved width", LogLevel::Debug);
//! assert_eq!(width, 640);
//! ```

use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn, Level};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Log `message` with `value` attached, then return `value`.
pub fn log<T: Debug>(value: T, message: &str, level: LogLevel) -> T {
    match level {
        LogLevel::Error => error!(value = ?value, "{message}"),
        LogLevel::Warn => warn!(value = ?value, "{message}"),
        LogLevel::Info => info!(value = ?value, "{message}"),
        LogLevel::Debug => debug!(value = ?value, "{message}"),
        LogLevel::Trace => trace!(value = ?value, "{message}"),
    }
    value
}
