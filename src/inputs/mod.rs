//! Input categorization.
//!
//! Walks the raw ordered input list, assigns each distinct file path a
//! stable zero-based file index (deduplicated), classifies each input as
//! video/audio/image/gap by extension, and resolves companion audio files
//! attached to video clips.
//!
//! Unrecognized extensions on non-gap paths are dropped with a warning, not
//! rejected; the export proceeds with what remains. See DESIGN.md before
//! changing this policy.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::models::{GapKind, TrackInput, TrackKind};

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "mkv", "avi", "webm", "m4v", "mts", "m2ts", "wmv", "flv",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "m4a", "flac", "ogg", "opus", "wma"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

/// Media class derived from a path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Video,
    Audio,
    Image,
}

/// Classify a path by its extension.
pub fn classify_path(path: &Path) -> Option<MediaClass> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaClass::Video)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaClass::Audio)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaClass::Image)
    } else {
        None
    }
}

/// One categorized input, tied back to its raw list position and its
/// deduplicated file index.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorizedInput {
    /// Position in the raw input list.
    pub original_index: usize,
    /// Deduplicated `-i` index; `None` for gap markers.
    pub file_index: Option<usize>,
    /// Media class after classification (gaps keep their declared kind).
    pub class: MediaClass,
    pub input: TrackInput,
}

impl CategorizedInput {
    pub fn is_gap(&self) -> bool {
        self.file_index.is_none()
    }
}

/// Result of categorizing a job's raw input list.
#[derive(Debug, Clone, Default)]
pub struct CategorizedInputs {
    /// Video and image inputs (and video-domain gaps), in raw-list order.
    pub video_inputs: Vec<CategorizedInput>,
    /// Audio inputs: explicit files, companions, audio-domain gaps.
    pub audio_inputs: Vec<CategorizedInput>,
    /// Distinct real files seen, in first-seen order.
    files: Vec<PathBuf>,
}

impl CategorizedInputs {
    /// Number of distinct real files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Distinct file paths in `-i` order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn index_for(&mut self, path: &Path) -> usize {
        if let Some(idx) = self.files.iter().position(|p| p == path) {
            return idx;
        }
        self.files.push(path.to_path_buf());
        self.files.len() - 1
    }
}

/// Categorize the raw ordered input list.
///
/// File indices are assigned in first-seen order and reused on repeats, so
/// the same file is never opened twice by the engine.
pub fn categorize(inputs: &[TrackInput]) -> CategorizedInputs {
    let mut out = CategorizedInputs::default();
    // Guards against registering the same video clip's companion twice when
    // the clip itself repeats.
    let mut seen_companions: HashMap<(usize, PathBuf), ()> = HashMap::new();

    for (original_index, input) in inputs.iter().enumerate() {
        if input.is_gap() {
            let entry = CategorizedInput {
                original_index,
                file_index: None,
                class: match gap_class(input) {
                    GapKind::Video => MediaClass::Video,
                    GapKind::Audio => MediaClass::Audio,
                },
                input: input.clone(),
            };
            match entry.class {
                MediaClass::Audio => out.audio_inputs.push(entry),
                _ => out.video_inputs.push(entry),
            }
            continue;
        }

        let Some(class) = classify_path(input.path()) else {
            tracing::warn!(
                "Dropping input with unrecognized extension: {}",
                input.path().display()
            );
            continue;
        };

        let file_index = out.index_for(input.path());
        let entry = CategorizedInput {
            original_index,
            file_index: Some(file_index),
            class,
            input: input.clone(),
        };

        match class {
            MediaClass::Audio => out.audio_inputs.push(entry),
            MediaClass::Video | MediaClass::Image => {
                // A video clip may carry a companion audio file.
                let companion = input
                    .as_clip()
                    .and_then(|c| c.audio_path.clone())
                    .filter(|p| !p.as_os_str().is_empty());
                out.video_inputs.push(entry);

                if class == MediaClass::Video {
                    if let Some(companion_path) = companion {
                        let companion_index = out.index_for(&companion_path);
                        let key = (original_index, companion_path.clone());
                        if seen_companions.insert(key, ()).is_none() {
                            out.audio_inputs.push(CategorizedInput {
                                original_index,
                                file_index: Some(companion_index),
                                class: MediaClass::Audio,
                                input: input.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    tracing::debug!(
        "Categorized {} inputs: {} video/image, {} audio, {} distinct files",
        inputs.len(),
        out.video_inputs.len(),
        out.audio_inputs.len(),
        out.file_count()
    );

    out
}

fn gap_class(input: &TrackInput) -> GapKind {
    // Gaps are classified by their declared kind, falling back to the
    // declared track type, never by extension.
    match input.as_clip().and_then(|c| c.track_type) {
        Some(TrackKind::Audio) => GapKind::Audio,
        Some(_) => GapKind::Video,
        None => input.gap_kind(),
    }
}
