//! Per-export logging.
//!
//! Each export run gets an [`ExportLogger`] that collects a full
//! transcript for failure reporting and mirrors lines to an optional file
//! and UI callback. Application-wide diagnostics go through `tracing`;
//! [`init_tracing`] wires up the global subscriber.

pub mod export_logger;
pub mod types;

pub use export_logger::ExportLogger;
pub use types::{LogCallback, LogConfig, LogLevel};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`, falling back to the provided default level.
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}
