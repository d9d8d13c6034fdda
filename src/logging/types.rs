//! Logger configuration.

use serde::{Deserialize, Serialize};

/// Callback invoked with each formatted log line, for UI display.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Severity threshold for the per-export logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Per-export logger behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// How many recent engine lines to keep for error diagnosis.
    pub error_tail: usize,
    /// Prefix every line with a wall-clock timestamp.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            error_tail: 40,
            show_timestamps: true,
        }
    }
}

impl LogConfig {
    /// Verbose configuration with a longer tail.
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
            error_tail: 100,
            show_timestamps: true,
        }
    }
}
