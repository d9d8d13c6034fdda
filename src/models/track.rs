//! Track inputs as handed over by the editor shell.
//!
//! The frontend serializes the timeline as an ordered list of inputs, either
//! a bare file path or a full clip record with placement, trim and transform
//! data. Field names follow the wire format (camelCase JSON).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::{GapKind, TrackKind};

/// Sentinel path marking deliberate empty timeline space.
pub const GAP_SENTINEL: &str = "__gap__";

/// Normalized position/scale/rotation applied to a clip on the canvas.
///
/// `x`/`y` are in `[-1, 1]`: `0` is centered, `-1`/`1` touch the canvas
/// edges. `scale` is a multiplier, `rotation` is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

impl Transform {
    /// True when applying this transform would be a no-op.
    pub fn is_identity(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.scale == 1.0 && self.rotation == 0.0
    }

    /// True when only the position differs from the identity (a pan).
    pub fn is_pan_only(&self) -> bool {
        !self.is_identity() && self.scale == 1.0 && self.rotation == 0.0
    }
}

/// One timeline input: a bare path or a full clip record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackInput {
    Path(PathBuf),
    Clip(Box<ClipInput>),
}

/// Full clip record with placement and presentation data.
///
/// `start_time`/`end_time`/`duration` are frame positions on the project
/// timeline; seconds are derived by dividing by the target frame rate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClipInput {
    pub path: PathBuf,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
    pub end_time: Option<f64>,
    pub track_type: Option<TrackKind>,
    /// Compositing order; higher renders on top.
    pub layer: Option<u32>,
    /// Alias for `layer` used by newer frontend builds.
    pub track_row_index: Option<u32>,
    pub visible: Option<bool>,
    pub muted: Option<bool>,
    pub video_transform: Option<Transform>,
    pub image_transform: Option<Transform>,
    /// Companion audio file logically attached to this video track.
    pub audio_path: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub aspect_ratio: Option<String>,
    pub gap_type: Option<GapKind>,
}

impl TrackInput {
    pub fn path(&self) -> &Path {
        match self {
            TrackInput::Path(p) => p,
            TrackInput::Clip(c) => &c.path,
        }
    }

    pub fn as_clip(&self) -> Option<&ClipInput> {
        match self {
            TrackInput::Path(_) => None,
            TrackInput::Clip(c) => Some(c),
        }
    }

    /// Whether this input is the explicit gap sentinel.
    pub fn is_gap(&self) -> bool {
        self.path().as_os_str() == GAP_SENTINEL
    }

    /// Compositing layer, defaulting to the background plane.
    ///
    /// `track_row_index` wins over `layer` when both are present.
    pub fn layer(&self) -> u32 {
        self.as_clip()
            .and_then(|c| c.track_row_index.or(c.layer))
            .unwrap_or(0)
    }

    pub fn is_visible(&self) -> bool {
        self.as_clip().and_then(|c| c.visible).unwrap_or(true)
    }

    pub fn is_muted(&self) -> bool {
        self.as_clip().and_then(|c| c.muted).unwrap_or(false)
    }

    pub fn gap_kind(&self) -> GapKind {
        self.as_clip().and_then(|c| c.gap_type).unwrap_or_default()
    }

    /// Transform for the visual presentation of this clip, if any.
    pub fn transform(&self) -> Option<Transform> {
        let clip = self.as_clip()?;
        clip.video_transform.or(clip.image_transform)
    }
}

impl From<&str> for TrackInput {
    fn from(path: &str) -> Self {
        TrackInput::Path(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_deserializes_as_path_variant() {
        let input: TrackInput = serde_json::from_str("\"/media/a.mp4\"").unwrap();
        assert_eq!(input, TrackInput::from("/media/a.mp4"));
        assert_eq!(input.layer(), 0);
        assert!(input.is_visible());
    }

    #[test]
    fn clip_record_deserializes_with_camel_case() {
        let input: TrackInput = serde_json::from_str(
            r#"{"path": "/media/a.mp4", "startTime": 0, "endTime": 150,
                "trackRowIndex": 2, "audioPath": "/media/a.wav"}"#,
        )
        .unwrap();
        let clip = input.as_clip().unwrap();
        assert_eq!(clip.end_time, Some(150.0));
        assert_eq!(input.layer(), 2);
        assert_eq!(clip.audio_path.as_deref(), Some(Path::new("/media/a.wav")));
    }

    #[test]
    fn gap_sentinel_is_recognized() {
        let input = TrackInput::from(GAP_SENTINEL);
        assert!(input.is_gap());
        assert!(!TrackInput::from("/media/a.mp4").is_gap());
    }

    #[test]
    fn track_row_index_wins_over_layer() {
        let clip = ClipInput {
            path: PathBuf::from("/media/a.mp4"),
            layer: Some(1),
            track_row_index: Some(3),
            ..Default::default()
        };
        assert_eq!(TrackInput::Clip(Box::new(clip)).layer(), 3);
    }

    #[test]
    fn identity_transform_detection() {
        assert!(Transform::default().is_identity());
        let pan = Transform {
            x: 0.25,
            ..Default::default()
        };
        assert!(pan.is_pan_only());
        let scaled = Transform {
            scale: 1.5,
            ..Default::default()
        };
        assert!(!scaled.is_pan_only());
        assert!(!scaled.is_identity());
    }
}
