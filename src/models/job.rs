//! Export job records.
//!
//! A job is the complete request handed over by the editor shell: the
//! ordered timeline inputs, the requested operations, and output metadata.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::HwaccelKind;
use super::track::TrackInput;

/// Frame dimensions of the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// True when width exceeds height.
    pub fn is_landscape(&self) -> bool {
        self.width >= self.height
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Requested export operations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Operations {
    pub concat: bool,
    pub trim: bool,
    pub crop: bool,
    /// Path to a prepared subtitle/text overlay file.
    pub subtitles: Option<PathBuf>,
    /// Desired output aspect ratio, e.g. `"16:9"` or `"9:16"`.
    pub aspect: Option<String>,
    /// Replace video-native audio with companion/explicit audio tracks.
    pub replace_audio: bool,
    pub normalize_frame_rate: bool,
    pub target_frame_rate: Option<f64>,
    /// Software encoder preset (ignored when hardware encoding is active).
    pub preset: Option<String>,
    pub threads: Option<u32>,
    pub use_hardware_acceleration: bool,
    /// Specific hardware family to use; falls back through the priority
    /// chain when unavailable.
    pub hwaccel_type: Option<HwaccelKind>,
    pub prefer_hevc: bool,
}

impl Operations {
    /// True when no operation requires a filter graph.
    pub fn is_plain(&self) -> bool {
        !self.concat
            && !self.trim
            && !self.crop
            && self.subtitles.is_none()
            && self.aspect.is_none()
            && !self.replace_audio
            && !self.normalize_frame_rate
    }
}

/// A complete export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    /// Ordered timeline inputs. Order matters only for file-index
    /// assignment; placement comes from each clip's declared frames.
    pub inputs: Vec<TrackInput>,
    /// Output file name.
    pub output: String,
    /// Output directory; defaults to the current directory.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub operations: Operations,
    /// Desired output canvas; source dimensions are used when absent.
    #[serde(default)]
    pub video_dimensions: Option<Dimensions>,
    /// Font families referenced by the subtitle file.
    #[serde(default)]
    pub subtitle_font_families: Vec<String>,
}

impl ExportJob {
    /// Minimal job with default operations.
    pub fn new(inputs: Vec<TrackInput>, output: impl Into<String>) -> Self {
        Self {
            inputs,
            output: output.into(),
            output_path: None,
            operations: Operations::default(),
            video_dimensions: None,
            subtitle_font_families: Vec::new(),
        }
    }

    /// Parse a job from the shell's JSON wire format.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Final output file path.
    pub fn output_file(&self) -> PathBuf {
        match &self.output_path {
            Some(dir) => dir.join(&self.output),
            None => PathBuf::from(&self.output),
        }
    }

    /// Target frame rate with the project default applied.
    pub fn target_frame_rate(&self) -> f64 {
        self.operations.target_frame_rate.unwrap_or(30.0)
    }
}
