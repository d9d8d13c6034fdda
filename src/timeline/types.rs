//! Timeline and segment types.

use crate::models::{TimelineKind, TrackInput, Transform};

/// One contiguous placement of a media source (or synthesized gap) on a
/// layer.
///
/// Created by the timeline builder from one categorized input; mutated only
/// by the gap filler (snapped or padded around); immutable thereafter.
/// Times are seconds on the project timeline, which for this editor is also
/// the source-time trim window of the clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Position of the originating input in the raw list; `None` for
    /// synthesized gaps.
    pub original_index: Option<usize>,
    /// Deduplicated engine file index; `None` for gaps.
    pub file_index: Option<usize>,
    pub start_time: f64,
    /// `None` when the clip declared no timing (full-stream playback).
    pub duration: Option<f64>,
    pub kind: TimelineKind,
    pub layer: u32,
    /// Originating input, kept for transform/dimension lookups.
    pub input: Option<TrackInput>,
}

impl Segment {
    /// Synthesized gap covering `[start, start + duration)`.
    pub fn gap(start_time: f64, duration: f64, kind: TimelineKind, layer: u32) -> Self {
        Self {
            original_index: None,
            file_index: None,
            start_time,
            duration: Some(duration),
            kind,
            layer,
            input: None,
        }
    }

    pub fn is_gap(&self) -> bool {
        self.file_index.is_none()
    }

    pub fn end_time(&self) -> Option<f64> {
        self.duration.map(|d| self.start_time + d)
    }

    pub fn transform(&self) -> Option<Transform> {
        self.input.as_ref().and_then(|i| i.transform())
    }

    /// Declared source dimensions, when the clip carries them.
    pub fn declared_dimensions(&self) -> Option<(u32, u32)> {
        let clip = self.input.as_ref()?.as_clip()?;
        Some((clip.width?, clip.height?))
    }
}

/// Ordered segment list for one layer (or the audio track).
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// Segments ordered by start time.
    pub segments: Vec<Segment>,
    /// Overall job duration; the gap-filled background and audio timelines
    /// span exactly `[0, total_duration)`.
    pub total_duration: f64,
    pub kind: TimelineKind,
}

impl Timeline {
    pub fn new(kind: TimelineKind) -> Self {
        Self {
            segments: Vec::new(),
            total_duration: 0.0,
            kind,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Latest known end time across segments.
    pub fn span_end(&self) -> f64 {
        self.segments
            .iter()
            .filter_map(Segment::end_time)
            .fold(0.0, f64::max)
    }

    /// True when every segment carries explicit timing.
    pub fn fully_timed(&self) -> bool {
        self.segments.iter().all(|s| s.duration.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_segment_shape() {
        let gap = Segment::gap(5.0, 2.0, TimelineKind::Video, 0);
        assert!(gap.is_gap());
        assert_eq!(gap.end_time(), Some(7.0));
        assert!(gap.input.is_none());
    }

    #[test]
    fn span_end_ignores_untimed_segments() {
        let mut tl = Timeline::new(TimelineKind::Video);
        tl.segments.push(Segment::gap(0.0, 4.0, TimelineKind::Video, 0));
        tl.segments.push(Segment {
            original_index: Some(0),
            file_index: Some(0),
            start_time: 4.0,
            duration: None,
            kind: TimelineKind::Video,
            layer: 0,
            input: None,
        });
        assert_eq!(tl.span_end(), 4.0);
        assert!(!tl.fully_timed());
    }
}
