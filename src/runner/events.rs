//! Events emitted while an export runs.

use std::path::PathBuf;

/// Final result of one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Whether the engine finished without error.
    pub success: bool,
    /// Whether the run ended because the user cancelled it.
    pub cancelled: bool,
    /// Full collected log text.
    pub log: String,
    /// Path of the written output, absent when cancelled.
    pub output: Option<PathBuf>,
}

/// Ordered event stream for a single export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    /// Raw progress line from the engine.
    Progress(String),
    /// Human-readable status derived from progress markers.
    Status(String),
    /// Raw engine output line with its stream tag.
    Log { line: String, stderr: bool },
    /// Terminal event carrying the outcome.
    Complete(ExportOutcome),
}

/// Derive a short status string from an engine progress line.
///
/// ffmpeg writes encode progress on stderr as
/// `frame=  123 fps= 30 ... time=00:00:04.10 ...`.
pub fn derive_status(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with("frame=") && !trimmed.starts_with("size=") {
        return None;
    }
    let time = trimmed
        .split_whitespace()
        .find_map(|tok| tok.strip_prefix("time="))?;
    Some(format!("Encoding {}", time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_extracted_from_progress_line() {
        let line = "frame=  123 fps= 30 q=28.0 size=    512kB time=00:00:04.10 bitrate=1023kbits/s";
        assert_eq!(derive_status(line), Some("Encoding 00:00:04.10".to_string()));
    }

    #[test]
    fn non_progress_lines_yield_no_status() {
        assert_eq!(derive_status("Stream mapping:"), None);
        assert_eq!(derive_status("[libx264 @ 0x55] using cpu capabilities"), None);
    }
}
