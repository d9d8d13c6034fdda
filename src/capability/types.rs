//! Capability descriptor types.

use serde::{Deserialize, Serialize};

use crate::models::HwaccelKind;

/// Hardware families available on the host, as reported by one probe of the
/// engine binary. Immutable once detected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Available families, in priority order.
    pub available: Vec<HwaccelKind>,
}

impl Detection {
    /// Best available hardware family, or `None` for software.
    pub fn best(&self) -> HwaccelKind {
        self.available.first().copied().unwrap_or(HwaccelKind::None)
    }

    pub fn supports(&self, kind: HwaccelKind) -> bool {
        kind == HwaccelKind::None || self.available.contains(&kind)
    }

    /// Resolve a request against what the host offers.
    ///
    /// A specifically requested family that is unavailable falls back to the
    /// best detected one, then to software. Never fails.
    pub fn resolve(&self, requested: Option<HwaccelKind>, prefer_hevc: bool) -> Capabilities {
        let kind = match requested {
            Some(kind) if self.supports(kind) => kind,
            Some(kind) => {
                tracing::warn!(
                    "Requested hardware family '{}' unavailable; falling back to '{}'",
                    kind,
                    self.best()
                );
                self.best()
            }
            None => self.best(),
        };
        Capabilities::for_kind(kind, prefer_hevc)
    }
}

/// Encoder selection for one hardware family (or software).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub kind: HwaccelKind,
    /// H.264 encoder name.
    pub video_codec: String,
    /// HEVC encoder name, when the family offers one.
    pub hevc_codec: Option<String>,
    /// Flags placed before the inputs (device initialization).
    pub global_flags: Vec<String>,
    /// Flags placed next to the codec selection.
    pub encoder_flags: Vec<String>,
    /// Chosen at resolve time from the job's HEVC preference.
    pub prefer_hevc: bool,
}

impl Capabilities {
    /// Software encoding descriptor.
    pub fn software(prefer_hevc: bool) -> Self {
        Self {
            kind: HwaccelKind::None,
            video_codec: "libx264".into(),
            hevc_codec: Some("libx265".into()),
            global_flags: Vec::new(),
            encoder_flags: Vec::new(),
            prefer_hevc,
        }
    }

    /// Descriptor for a specific family.
    pub fn for_kind(kind: HwaccelKind, prefer_hevc: bool) -> Self {
        let strs = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        match kind {
            HwaccelKind::None => Self::software(prefer_hevc),
            HwaccelKind::Nvenc => Self {
                kind,
                video_codec: "h264_nvenc".into(),
                hevc_codec: Some("hevc_nvenc".into()),
                global_flags: Vec::new(),
                encoder_flags: strs(&["-preset", "p4", "-rc", "vbr", "-cq", "23"]),
                prefer_hevc,
            },
            HwaccelKind::Qsv => Self {
                kind,
                video_codec: "h264_qsv".into(),
                hevc_codec: Some("hevc_qsv".into()),
                global_flags: Vec::new(),
                encoder_flags: strs(&["-global_quality", "23"]),
                prefer_hevc,
            },
            HwaccelKind::Amf => Self {
                kind,
                video_codec: "h264_amf".into(),
                hevc_codec: Some("hevc_amf".into()),
                global_flags: Vec::new(),
                encoder_flags: strs(&["-quality", "balanced"]),
                prefer_hevc,
            },
            HwaccelKind::VideoToolbox => Self {
                kind,
                video_codec: "h264_videotoolbox".into(),
                hevc_codec: Some("hevc_videotoolbox".into()),
                global_flags: Vec::new(),
                encoder_flags: strs(&["-b:v", "8M"]),
                prefer_hevc,
            },
            HwaccelKind::Vaapi => Self {
                kind,
                video_codec: "h264_vaapi".into(),
                hevc_codec: Some("hevc_vaapi".into()),
                global_flags: strs(&["-vaapi_device", "/dev/dri/renderD128"]),
                encoder_flags: strs(&["-qp", "23"]),
                prefer_hevc,
            },
        }
    }

    /// True when a hardware family (not software) is active.
    pub fn is_hardware(&self) -> bool {
        self.kind != HwaccelKind::None
    }

    /// The encoder to emit, honoring the HEVC preference when possible.
    pub fn selected_codec(&self) -> &str {
        if self.prefer_hevc {
            if let Some(hevc) = &self.hevc_codec {
                return hevc;
            }
        }
        &self.video_codec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_detection_resolves_to_software() {
        let detection = Detection::default();
        let caps = detection.resolve(None, false);
        assert_eq!(caps.kind, HwaccelKind::None);
        assert_eq!(caps.selected_codec(), "libx264");
    }

    #[test]
    fn unavailable_request_falls_back_without_error() {
        let detection = Detection {
            available: vec![HwaccelKind::Qsv],
        };
        let caps = detection.resolve(Some(HwaccelKind::Nvenc), false);
        assert_eq!(caps.kind, HwaccelKind::Qsv);
    }

    #[test]
    fn available_request_is_honored() {
        let detection = Detection {
            available: vec![HwaccelKind::Nvenc, HwaccelKind::Vaapi],
        };
        let caps = detection.resolve(Some(HwaccelKind::Vaapi), false);
        assert_eq!(caps.kind, HwaccelKind::Vaapi);
        assert!(caps.global_flags.contains(&"-vaapi_device".to_string()));
    }

    #[test]
    fn hevc_preference_selects_hevc_codec() {
        let caps = Capabilities::for_kind(HwaccelKind::Nvenc, true);
        assert_eq!(caps.selected_codec(), "hevc_nvenc");
        let sw = Capabilities::software(true);
        assert_eq!(sw.selected_codec(), "libx265");
    }
}
