//! Hardware encoder detection.
//!
//! Runs one `ffmpeg -encoders` probe per unique engine binary path and
//! memoizes the result. The probe has a short timeout that resolves to the
//! software default instead of propagating failure.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::HwaccelKind;

use super::types::Detection;

/// How long the probe may run before we assume software-only.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

fn encoder_name(kind: HwaccelKind) -> &'static str {
    match kind {
        HwaccelKind::Nvenc => "h264_nvenc",
        HwaccelKind::Qsv => "h264_qsv",
        HwaccelKind::Amf => "h264_amf",
        HwaccelKind::VideoToolbox => "h264_videotoolbox",
        HwaccelKind::Vaapi => "h264_vaapi",
        HwaccelKind::None => "libx264",
    }
}

/// Parse `ffmpeg -encoders` output into the available families, in priority
/// order.
pub fn parse_encoder_list(output: &str) -> Detection {
    let available = HwaccelKind::PRIORITY
        .into_iter()
        .filter(|kind| {
            output
                .lines()
                .any(|line| line.split_whitespace().any(|w| w == encoder_name(*kind)))
        })
        .collect();
    Detection { available }
}

/// Run the encoder probe against one engine binary.
///
/// Never fails: spawn errors, timeouts, and unreadable output all resolve to
/// the software-only default.
pub fn probe_encoders(engine_binary: &Path) -> Detection {
    let child = Command::new(engine_binary)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(
                "Encoder probe failed to start ({}): {}",
                engine_binary.display(),
                e
            );
            return Detection::default();
        }
    };

    // Drain stdout on a helper thread so a chatty binary cannot deadlock the
    // timeout loop on a full pipe.
    let (tx, rx) = mpsc::channel();
    if let Some(mut stdout) = child.stdout.take() {
        std::thread::spawn(move || {
            use std::io::Read;
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf);
            let _ = tx.send(buf);
        });
    }

    let deadline = Instant::now() + PROBE_TIMEOUT;
    loop {
        match child.try_wait() {
            Ok(Some(_status)) => break,
            Ok(None) if Instant::now() >= deadline => {
                tracing::warn!("Encoder probe timed out; assuming software encoding only");
                let _ = child.kill();
                let _ = child.wait();
                return Detection::default();
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(25)),
            Err(e) => {
                tracing::warn!("Encoder probe wait failed: {}", e);
                return Detection::default();
            }
        }
    }

    let output = rx.recv_timeout(Duration::from_millis(250)).unwrap_or_default();
    let detection = parse_encoder_list(&output);
    tracing::info!(
        "Hardware detection for {}: best = {}",
        engine_binary.display(),
        detection.best()
    );
    detection
}

/// Memoized capability detection, keyed by engine binary path.
///
/// Explicitly owned state: construct one, pass it where detection is needed,
/// and call [`CapabilityCache::clear`] to force re-probing. Reads and writes
/// are not interleaved with job execution, so a plain mutex suffices.
#[derive(Default)]
pub struct CapabilityCache {
    entries: Mutex<HashMap<PathBuf, Detection>>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detection result for one binary, probing on first use.
    pub fn detect(&self, engine_binary: &Path) -> Detection {
        if let Some(found) = self.entries.lock().get(engine_binary) {
            return found.clone();
        }
        // Probe outside the lock; detection is idempotent so a racing
        // duplicate probe is harmless.
        let detection = probe_encoders(engine_binary);
        self.entries
            .lock()
            .entry(engine_binary.to_path_buf())
            .or_insert(detection)
            .clone()
    }

    /// Pre-seed a detection result (used by hosts that probe elsewhere, and
    /// by tests).
    pub fn seed(&self, engine_binary: impl Into<PathBuf>, detection: Detection) {
        self.entries.lock().insert(engine_binary.into(), detection);
    }

    /// Drop all memoized results.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Encoders:
 V..... libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V..... h264_nvenc           NVIDIA NVENC H.264 encoder
 V..... hevc_nvenc           NVIDIA NVENC hevc encoder
 V..... h264_vaapi           H.264/AVC (VAAPI)
 A..... aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn parses_families_in_priority_order() {
        let detection = parse_encoder_list(SAMPLE);
        assert_eq!(
            detection.available,
            vec![HwaccelKind::Nvenc, HwaccelKind::Vaapi]
        );
        assert_eq!(detection.best(), HwaccelKind::Nvenc);
    }

    #[test]
    fn no_hardware_lines_means_software() {
        let detection = parse_encoder_list("Encoders:\n V..... libx264  something\n");
        assert!(detection.available.is_empty());
        assert_eq!(detection.best(), HwaccelKind::None);
    }

    #[test]
    fn encoder_name_must_match_whole_word() {
        // "xh264_nvencx" must not count as nvenc.
        let detection = parse_encoder_list(" V..... xh264_nvencx fake encoder\n");
        assert!(detection.available.is_empty());
    }

    #[test]
    fn cache_returns_seeded_value_without_probing() {
        let cache = CapabilityCache::new();
        let seeded = Detection {
            available: vec![HwaccelKind::Qsv],
        };
        cache.seed("/opt/ffmpeg", seeded.clone());
        assert_eq!(cache.detect(Path::new("/opt/ffmpeg")), seeded);
        cache.clear();
        // After clearing, a probe of a nonexistent binary resolves to the
        // software default rather than an error.
        assert_eq!(
            cache.detect(Path::new("/nonexistent/definitely-not-ffmpeg")),
            Detection::default()
        );
    }
}
