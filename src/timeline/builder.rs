//! Timeline construction from categorized inputs.
//!
//! Each clip's on-timeline placement comes from its declared start/end frame
//! positions (seconds = frames / target fps), not from its position in the
//! input list. That is what lets clips be reordered and layered
//! independently of file order. Untimed bare-path inputs are placed
//! sequentially after the previous segment of their layer and play in full.

use std::collections::BTreeMap;

use crate::inputs::{CategorizedInput, CategorizedInputs, MediaClass};
use crate::models::{TimelineKind, TrackInput};

use super::types::{Segment, Timeline};

/// Per-layer timelines for one job.
#[derive(Debug, Clone)]
pub struct TimelineSet {
    /// Video layers keyed by compositing order (lowest = background).
    pub video_layers: BTreeMap<u32, Timeline>,
    /// Image layers, overlaid independently of the video stack.
    pub image_layers: BTreeMap<u32, Timeline>,
    /// The single audio track.
    pub audio: Timeline,
    /// Audio segments that overlap an earlier one; mixed on top of the
    /// main lane instead of concatenated into it.
    pub audio_overlays: Vec<Segment>,
}

impl TimelineSet {
    /// Layer number of the visual background (lowest video layer).
    pub fn background_layer(&self) -> Option<u32> {
        self.video_layers.keys().next().copied()
    }

    /// Overall job duration across all layers and the audio track.
    pub fn span_end(&self) -> f64 {
        let video = self.video_layers.values().map(Timeline::span_end);
        let image = self.image_layers.values().map(Timeline::span_end);
        video
            .chain(image)
            .chain(std::iter::once(self.audio.span_end()))
            .fold(0.0, f64::max)
    }

    pub fn has_video_content(&self) -> bool {
        self.video_layers.values().any(|t| !t.is_empty())
            || self.image_layers.values().any(|t| !t.is_empty())
    }
}

/// Build per-layer timelines from categorized inputs.
///
/// `replace_audio` drops video-native audio so explicit/companion tracks
/// stand alone.
pub fn build_timelines(
    categorized: &CategorizedInputs,
    target_frame_rate: f64,
    replace_audio: bool,
) -> TimelineSet {
    let mut video_layers: BTreeMap<u32, Timeline> = BTreeMap::new();
    let mut image_layers: BTreeMap<u32, Timeline> = BTreeMap::new();
    let mut audio = Timeline::new(TimelineKind::Audio);

    for entry in &categorized.video_inputs {
        if !entry.input.is_visible() {
            tracing::debug!("Skipping hidden input #{}", entry.original_index);
        } else {
            match entry.class {
                MediaClass::Image => {
                    place_image(&mut image_layers, entry, target_frame_rate);
                }
                _ => place_video(&mut video_layers, entry, target_frame_rate),
            }
        }

        // A hidden video clip still contributes its native audio unless
        // muted or superseded by a companion track.
        if entry.class == MediaClass::Video
            && !entry.is_gap()
            && !entry.input.is_muted()
            && !replace_audio
            && !has_companion(&entry.input)
        {
            push_segment(
                &mut audio.segments,
                make_segment(entry, TimelineKind::Audio, target_frame_rate),
            );
        }
    }

    for entry in &categorized.audio_inputs {
        if entry.input.is_muted() {
            continue;
        }
        push_segment(
            &mut audio.segments,
            make_segment(entry, TimelineKind::Audio, target_frame_rate),
        );
    }

    let mut set = TimelineSet {
        video_layers,
        image_layers,
        audio,
        audio_overlays: Vec::new(),
    };

    let total = set.span_end();
    for timeline in set
        .video_layers
        .values_mut()
        .chain(set.image_layers.values_mut())
    {
        timeline.total_duration = total;
    }
    set.audio.total_duration = total;

    set
}

fn has_companion(input: &TrackInput) -> bool {
    input
        .as_clip()
        .and_then(|c| c.audio_path.as_ref())
        .is_some_and(|p| !p.as_os_str().is_empty())
}

fn place_video(
    layers: &mut BTreeMap<u32, Timeline>,
    entry: &CategorizedInput,
    fps: f64,
) {
    let layer = entry.input.layer();
    let timeline = layers
        .entry(layer)
        .or_insert_with(|| Timeline::new(TimelineKind::Video));
    let segment = make_segment(entry, TimelineKind::Video, fps);
    push_segment(&mut timeline.segments, segment);
}

fn place_image(layers: &mut BTreeMap<u32, Timeline>, entry: &CategorizedInput, fps: f64) {
    let segment = make_segment(entry, TimelineKind::Video, fps);
    match segment.duration {
        Some(d) if d > 0.0 => {
            let timeline = layers
                .entry(entry.input.layer())
                .or_insert_with(|| Timeline::new(TimelineKind::Video));
            push_segment(&mut timeline.segments, segment);
        }
        _ => {
            // Degenerate edit state, not fatal.
            tracing::warn!(
                "Dropping image with non-positive duration: {}",
                entry.input.path().display()
            );
        }
    }
}

/// Convert one categorized input into a segment, resolving declared frame
/// positions to seconds.
fn make_segment(entry: &CategorizedInput, kind: TimelineKind, fps: f64) -> Segment {
    let clip = entry.input.as_clip();
    let start_frames = clip.and_then(|c| c.start_time);
    let end_frames = clip.and_then(|c| c.end_time);
    let duration_frames = clip.and_then(|c| c.duration);

    let start_time = start_frames.map(|f| f / fps).unwrap_or(0.0);
    let duration = match (end_frames, duration_frames) {
        (Some(end), _) => Some((end / fps - start_time).max(0.0)),
        (None, Some(d)) => Some(d / fps),
        (None, None) => None,
    };

    Segment {
        original_index: Some(entry.original_index),
        file_index: entry.file_index,
        start_time,
        duration,
        kind,
        layer: entry.input.layer(),
        input: Some(entry.input.clone()),
    }
}

/// Insert keeping the list ordered by start time (stable for ties).
fn push_segment(segments: &mut Vec<Segment>, segment: Segment) {
    let at = segments
        .iter()
        .position(|s| s.start_time > segment.start_time)
        .unwrap_or(segments.len());
    segments.insert(at, segment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::categorize;
    use crate::models::{ClipInput, TrackInput};
    use std::path::PathBuf;

    fn timed_clip(path: &str, start: f64, end: f64, layer: u32) -> TrackInput {
        TrackInput::Clip(Box::new(ClipInput {
            path: PathBuf::from(path),
            start_time: Some(start),
            end_time: Some(end),
            layer: Some(layer),
            ..Default::default()
        }))
    }

    #[test]
    fn placement_uses_declared_frames_not_list_order() {
        // Second list entry starts first on the timeline.
        let inputs = vec![
            timed_clip("/m/a.mp4", 150.0, 300.0, 0),
            timed_clip("/m/b.mp4", 0.0, 150.0, 0),
        ];
        let set = build_timelines(&categorize(&inputs), 30.0, false);
        let layer = &set.video_layers[&0];
        assert_eq!(layer.segments.len(), 2);
        assert_eq!(layer.segments[0].start_time, 0.0);
        assert_eq!(layer.segments[0].file_index, Some(1));
        assert_eq!(layer.segments[1].start_time, 5.0);
        assert_eq!(layer.segments[1].duration, Some(5.0));
    }

    #[test]
    fn layers_are_kept_separate() {
        let inputs = vec![
            timed_clip("/m/a.mp4", 0.0, 60.0, 0),
            timed_clip("/m/b.mp4", 0.0, 60.0, 2),
        ];
        let set = build_timelines(&categorize(&inputs), 30.0, false);
        assert_eq!(set.video_layers.len(), 2);
        assert_eq!(set.background_layer(), Some(0));
    }

    #[test]
    fn images_route_to_image_layers_and_degenerates_drop() {
        let good = TrackInput::Clip(Box::new(ClipInput {
            path: PathBuf::from("/m/logo.png"),
            start_time: Some(0.0),
            end_time: Some(90.0),
            layer: Some(1),
            ..Default::default()
        }));
        let degenerate = TrackInput::Clip(Box::new(ClipInput {
            path: PathBuf::from("/m/bad.png"),
            start_time: Some(60.0),
            end_time: Some(60.0),
            ..Default::default()
        }));
        let set = build_timelines(&categorize(&[good, degenerate]), 30.0, false);
        assert_eq!(set.image_layers.len(), 1);
        assert_eq!(set.image_layers[&1].segments.len(), 1);
        assert_eq!(set.image_layers[&1].segments[0].duration, Some(3.0));
        assert!(set.video_layers.is_empty());
    }

    #[test]
    fn native_audio_follows_video_unless_replaced() {
        let inputs = vec![timed_clip("/m/a.mp4", 0.0, 300.0, 0)];
        let with_native = build_timelines(&categorize(&inputs), 30.0, false);
        assert_eq!(with_native.audio.segments.len(), 1);

        let replaced = build_timelines(&categorize(&inputs), 30.0, true);
        assert!(replaced.audio.is_empty());
    }

    #[test]
    fn companion_audio_supersedes_native() {
        let clip = TrackInput::Clip(Box::new(ClipInput {
            path: PathBuf::from("/m/a.mp4"),
            start_time: Some(0.0),
            end_time: Some(300.0),
            audio_path: Some(PathBuf::from("/m/a.wav")),
            ..Default::default()
        }));
        let set = build_timelines(&categorize(&[clip]), 30.0, false);
        // One audio segment, pointing at the companion's file index.
        assert_eq!(set.audio.segments.len(), 1);
        assert_eq!(set.audio.segments[0].file_index, Some(1));
    }

    #[test]
    fn total_duration_spans_all_layers() {
        let inputs = vec![
            timed_clip("/m/a.mp4", 0.0, 150.0, 0),
            timed_clip("/m/b.mp4", 300.0, 450.0, 1),
        ];
        let set = build_timelines(&categorize(&inputs), 30.0, false);
        assert_eq!(set.video_layers[&0].total_duration, 15.0);
        assert_eq!(set.audio.total_duration, 15.0);
    }

    #[test]
    fn muted_video_contributes_no_audio() {
        let clip = TrackInput::Clip(Box::new(ClipInput {
            path: PathBuf::from("/m/a.mp4"),
            start_time: Some(0.0),
            end_time: Some(300.0),
            muted: Some(true),
            ..Default::default()
        }));
        let set = build_timelines(&categorize(&[clip]), 30.0, false);
        assert!(set.audio.is_empty());
        assert_eq!(set.video_layers.len(), 1);
    }
}
