//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field has a serde default so partial files load cleanly.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Engine binary and probing settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Encoding defaults applied when the job does not override them.
    #[serde(default)]
    pub encoding: EncodingSettings,

    /// Path configuration.
    #[serde(default)]
    pub paths: PathSettings,
}

/// External engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Path or name of the ffmpeg binary.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Preferred hardware family, `auto` probes the host.
    #[serde(default = "default_hwaccel")]
    pub hwaccel: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            hwaccel: default_hwaccel(),
        }
    }
}

/// Software encode defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingSettings {
    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    /// Default output frame rate when the job does not request one.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    #[serde(default)]
    pub prefer_hevc: bool,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            crf: default_crf(),
            frame_rate: default_frame_rate(),
            prefer_hevc: false,
        }
    }
}

/// Output and log directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Extra font directories searched for subtitle rendering.
    #[serde(default)]
    pub font_dirs: Vec<String>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
            font_dirs: Vec::new(),
        }
    }
}

fn default_binary() -> String {
    "ffmpeg".to_string()
}

fn default_hwaccel() -> String {
    "auto".to_string()
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_crf() -> u32 {
    23
}

fn default_frame_rate() -> f64 {
    30.0
}

fn default_output_folder() -> String {
    "exports".to_string()
}

fn default_logs_folder() -> String {
    "exports/logs".to_string()
}
