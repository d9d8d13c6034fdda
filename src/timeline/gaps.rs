//! Gap filling.
//!
//! Guarantees contiguous coverage for the timelines that need it: the audio
//! track and the single lowest-numbered video layer (the visual background).
//! Upper layers stay sparse so their content never forcibly composites
//! black or silence over what is below.

use crate::models::TimelineKind;

use super::types::{Segment, Timeline};

/// Fill gaps in a segment list so it covers `[0, target_duration)`.
///
/// Algorithm: sort by start time, then walk with a running cursor. A gap
/// larger than half a frame becomes a synthetic gap segment of exactly that
/// size; anything smaller is floating-point drift from frame/second
/// conversion, and the next segment is snapped to the cursor instead so no
/// one-frame black flash is emitted. A segment that overlaps the previous
/// one by more than half a frame is dropped: its start time doubles as the
/// source trim window, so shifting it would both desync the lane and play
/// the wrong part of the source. Callers that want overlapping content
/// mixed run [`extract_overlaps`] first.
pub fn fill_gaps(
    timeline: &Timeline,
    target_frame_rate: f64,
    target_duration: f64,
) -> Timeline {
    let mut out = timeline.clone();

    if !out.fully_timed() {
        // Untimed full-stream segments have no measurable gaps.
        tracing::debug!("Skipping gap fill for {} timeline with untimed segments", out.kind);
        return out;
    }

    out.segments
        .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let half_frame = 0.5 / target_frame_rate;
    let layer = out.segments.first().map(|s| s.layer).unwrap_or(0);
    let mut filled: Vec<Segment> = Vec::with_capacity(out.segments.len());
    let mut cursor = 0.0_f64;

    for mut segment in out.segments.drain(..) {
        let gap = segment.start_time - cursor;

        if gap > half_frame {
            tracing::debug!(
                "Inserting {:.3}s {} gap at {:.3}s",
                gap,
                out.kind,
                cursor
            );
            filled.push(Segment::gap(cursor, gap, out.kind, layer));
        } else if gap < -half_frame {
            tracing::warn!(
                "Dropping segment at {:.3}s overlapping previous content through {:.3}s",
                segment.start_time,
                cursor
            );
            continue;
        } else if gap.abs() > f64::EPSILON {
            segment.start_time = cursor;
        }

        cursor = segment.end_time().unwrap_or(cursor);
        filled.push(segment);
    }

    // Trailing coverage out to the full job duration.
    let tail = target_duration - cursor;
    if tail > half_frame {
        filled.push(Segment::gap(cursor, tail, out.kind, layer));
    }

    out.segments = filled;
    out.total_duration = target_duration.max(cursor);
    out
}

/// Remove segments that overlap earlier content by more than half a frame,
/// returning them with their trim windows untouched. Segments are walked in
/// start order; the first claimant of a time range stays on the lane.
pub fn extract_overlaps(timeline: &mut Timeline, target_frame_rate: f64) -> Vec<Segment> {
    if !timeline.fully_timed() {
        return Vec::new();
    }
    timeline
        .segments
        .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let half_frame = 0.5 / target_frame_rate;
    let mut kept: Vec<Segment> = Vec::with_capacity(timeline.segments.len());
    let mut overlaps = Vec::new();
    let mut cursor = 0.0_f64;

    for segment in timeline.segments.drain(..) {
        if segment.start_time < cursor - half_frame {
            overlaps.push(segment);
        } else {
            cursor = segment.end_time().unwrap_or(cursor).max(cursor);
            kept.push(segment);
        }
    }
    timeline.segments = kept;
    overlaps
}

/// Apply gap filling where the compiler requires it: the audio track
/// unconditionally, and only the background video layer.
///
/// Overlapping audio segments are pulled off the lane first and stashed on
/// the set for the compiler to mix on top. Overlapping background video has
/// no compositing story on a single lane and is dropped.
pub fn fill_required_gaps(
    set: &mut super::builder::TimelineSet,
    target_frame_rate: f64,
) {
    let total = set.span_end();

    if let Some(background) = set.background_layer() {
        if let Some(timeline) = set.video_layers.get_mut(&background) {
            let dropped = extract_overlaps(timeline, target_frame_rate);
            if !dropped.is_empty() {
                tracing::warn!(
                    "Dropping {} background video segment(s) overlapping earlier clips",
                    dropped.len()
                );
            }
            *timeline = fill_gaps(timeline, target_frame_rate, total);
        }
    }

    if !set.audio.is_empty() {
        set.audio_overlays = extract_overlaps(&mut set.audio, target_frame_rate);
        set.audio = fill_gaps(&set.audio, target_frame_rate, total);
        debug_assert_eq!(set.audio.kind, TimelineKind::Audio);
    }
}
