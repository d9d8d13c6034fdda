//! Core enums used throughout the export engine.

use serde::{Deserialize, Serialize};

/// Declared type of a timeline track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    #[default]
    Video,
    Audio,
    Image,
    Text,
    Subtitle,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Image => write!(f, "image"),
            TrackKind::Text => write!(f, "text"),
            TrackKind::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// What a gap marker stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapKind {
    /// Solid black video.
    #[default]
    Video,
    /// Silence.
    Audio,
}

/// Which media domain a timeline carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    Video,
    Audio,
}

impl std::fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimelineKind::Video => write!(f, "video"),
            TimelineKind::Audio => write!(f, "audio"),
        }
    }
}

/// Hardware acceleration family.
///
/// Mutually exclusive selection; `None` means software encoding. Ordered by
/// detection priority, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HwaccelKind {
    Nvenc,
    Qsv,
    Amf,
    #[serde(rename = "videotoolbox")]
    VideoToolbox,
    Vaapi,
    #[default]
    None,
}

impl HwaccelKind {
    /// Detection priority, best first. `None` is the universal fallback and
    /// is deliberately absent.
    pub const PRIORITY: [HwaccelKind; 5] = [
        HwaccelKind::Nvenc,
        HwaccelKind::Qsv,
        HwaccelKind::Amf,
        HwaccelKind::VideoToolbox,
        HwaccelKind::Vaapi,
    ];

    /// Whether this family needs an explicit device-upload node appended to
    /// the filter graph (only VAAPI does; the rest work purely through codec
    /// selection).
    pub fn needs_upload(&self) -> bool {
        matches!(self, HwaccelKind::Vaapi)
    }
}

impl std::fmt::Display for HwaccelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HwaccelKind::Nvenc => write!(f, "nvenc"),
            HwaccelKind::Qsv => write!(f, "qsv"),
            HwaccelKind::Amf => write!(f, "amf"),
            HwaccelKind::VideoToolbox => write!(f, "videotoolbox"),
            HwaccelKind::Vaapi => write!(f, "vaapi"),
            HwaccelKind::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for HwaccelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nvenc" | "nvidia" => Ok(HwaccelKind::Nvenc),
            "qsv" | "quicksync" | "intel" => Ok(HwaccelKind::Qsv),
            "amf" | "amd" => Ok(HwaccelKind::Amf),
            "videotoolbox" | "apple" => Ok(HwaccelKind::VideoToolbox),
            "vaapi" => Ok(HwaccelKind::Vaapi),
            "none" | "software" => Ok(HwaccelKind::None),
            other => Err(format!("unknown hwaccel kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_excludes_software() {
        assert!(!HwaccelKind::PRIORITY.contains(&HwaccelKind::None));
        assert_eq!(HwaccelKind::PRIORITY[0], HwaccelKind::Nvenc);
    }

    #[test]
    fn only_vaapi_needs_upload() {
        for kind in HwaccelKind::PRIORITY {
            assert_eq!(kind.needs_upload(), kind == HwaccelKind::Vaapi);
        }
        assert!(!HwaccelKind::None.needs_upload());
    }

    #[test]
    fn parses_vendor_aliases() {
        assert_eq!("nvidia".parse::<HwaccelKind>().unwrap(), HwaccelKind::Nvenc);
        assert_eq!("software".parse::<HwaccelKind>().unwrap(), HwaccelKind::None);
        assert!("voodoo".parse::<HwaccelKind>().is_err());
    }
}
