//! Per-export logger with file and callback output.
//!
//! Each export gets its own logger that collects the full transcript for
//! failure reporting, optionally mirrors lines to a log file and a UI
//! callback, and keeps a tail buffer of raw engine output.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel};

struct LoggerState {
    file_writer: Option<BufWriter<File>>,
    callback: Option<LogCallback>,
    transcript: String,
    tail: VecDeque<String>,
}

/// Per-export logger with transcript collection.
pub struct ExportLogger {
    log_path: Option<PathBuf>,
    config: LogConfig,
    state: Arc<Mutex<LoggerState>>,
}

impl ExportLogger {
    /// Create a logger writing only to the in-memory transcript.
    pub fn new(config: LogConfig) -> Self {
        Self {
            log_path: None,
            config,
            state: Arc::new(Mutex::new(LoggerState {
                file_writer: None,
                callback: None,
                transcript: String::new(),
                tail: VecDeque::new(),
            })),
        }
    }

    /// Create a logger that also mirrors lines to a file.
    pub fn with_file(config: LogConfig, log_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let log_path = log_path.as_ref().to_path_buf();
        let file = File::create(&log_path)?;
        let logger = Self::new(config);
        logger.state.lock().file_writer = Some(BufWriter::new(file));
        Ok(Self {
            log_path: Some(log_path),
            ..logger
        })
    }

    /// Register a UI callback receiving each formatted line.
    pub fn set_callback(&self, callback: LogCallback) {
        self.state.lock().callback = Some(callback);
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        let formatted = self.format_line(message);
        self.output(&formatted);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &format!("[warning] {}", message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &format!("[error] {}", message));
    }

    /// Log the assembled engine command line.
    pub fn command(&self, pretty: &str) {
        self.log(LogLevel::Info, &format!("$ {}", pretty));
    }

    /// Record one raw engine output line, tagged with its stream.
    pub fn engine_line(&self, line: &str, is_stderr: bool) {
        {
            let mut state = self.state.lock();
            if state.tail.len() >= self.config.error_tail {
                state.tail.pop_front();
            }
            state.tail.push_back(line.to_string());
        }
        let prefix = if is_stderr { "[stderr] " } else { "" };
        self.log(LogLevel::Debug, &format!("{}{}", prefix, line));
    }

    /// Recent engine lines, newest last.
    pub fn tail(&self) -> Vec<String> {
        self.state.lock().tail.iter().cloned().collect()
    }

    /// The full transcript collected so far.
    pub fn transcript(&self) -> String {
        self.state.lock().transcript.clone()
    }

    /// Flush any buffered file output.
    pub fn flush(&self) {
        if let Some(writer) = self.state.lock().file_writer.as_mut() {
            let _ = writer.flush();
        }
    }

    fn format_line(&self, message: &str) -> String {
        if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S%.3f"), message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, line: &str) {
        let mut state = self.state.lock();
        state.transcript.push_str(line);
        state.transcript.push('\n');
        if let Some(writer) = state.file_writer.as_mut() {
            let _ = writeln!(writer, "{}", line);
        }
        if let Some(callback) = state.callback.as_ref() {
            callback(line);
        }
    }
}
