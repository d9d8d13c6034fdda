//! Per-segment filter chains.
//!
//! Every segment becomes one chain producing one label: gaps synthesize
//! black video or silence sized to their duration, real segments get a
//! trim + timestamp-reset chain. Frame-rate and sample-format/SAR
//! normalization are appended per segment so later concatenation never
//! fails on mismatched SAR, fps, or sample rate.

use crate::models::Dimensions;
use crate::timeline::Segment;

use super::graph::{FilterGraph, StreamRef};

/// Audio mixing format every segment is normalized to.
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;
pub const AUDIO_CHANNEL_LAYOUT: &str = "stereo";

/// Shared per-job parameters for segment preparation.
#[derive(Debug, Clone, Copy)]
pub struct SegmentCtx {
    /// Canvas all video segments are normalized to before compositing.
    pub canvas: Dimensions,
    pub frame_rate: f64,
    /// Emit an `fps` node per segment (requested frame-rate normalization).
    pub normalize_frame_rate: bool,
}

/// Format a time value with fixed millisecond precision, so compiled
/// graphs are byte-stable.
pub fn fmt_secs(value: f64) -> String {
    format!("{:.3}", value)
}

/// Emit the chain for one video-timeline segment, producing `label`.
pub fn prepare_video_segment(
    graph: &mut FilterGraph,
    segment: &Segment,
    ctx: &SegmentCtx,
    label: &str,
) {
    let Some(file_index) = segment.file_index else {
        // Gaps and sourceless segments synthesize black.
        let duration = segment.duration.unwrap_or(0.0);
        graph.add(
            Vec::new(),
            format!(
                "color=c=black:s={}:r={}:d={}",
                ctx.canvas,
                ctx.frame_rate,
                fmt_secs(duration)
            ),
            vec![label.to_string()],
        );
        return;
    };

    let mut body = String::new();
    if let Some(end) = segment.end_time() {
        body.push_str(&format!(
            "trim=start={}:end={},",
            fmt_secs(segment.start_time),
            fmt_secs(end)
        ));
    }
    body.push_str("setpts=PTS-STARTPTS");
    if ctx.normalize_frame_rate {
        body.push_str(&format!(",fps={}", ctx.frame_rate));
    }
    body.push_str(&format!(
        ",scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1",
        w = ctx.canvas.width,
        h = ctx.canvas.height
    ));

    graph.add(
        vec![StreamRef::video(file_index)],
        body,
        vec![label.to_string()],
    );
}

/// Emit the chain for one audio-timeline segment, producing `label`.
pub fn prepare_audio_segment(graph: &mut FilterGraph, segment: &Segment, label: &str) {
    let Some(file_index) = segment.file_index else {
        // Gaps and sourceless segments synthesize silence.
        let duration = segment.duration.unwrap_or(0.0);
        graph.add(
            Vec::new(),
            format!(
                "anullsrc=channel_layout={}:sample_rate={},atrim=0:{},asetpts=PTS-STARTPTS",
                AUDIO_CHANNEL_LAYOUT,
                AUDIO_SAMPLE_RATE,
                fmt_secs(duration)
            ),
            vec![label.to_string()],
        );
        return;
    };

    let mut body = String::new();
    if let Some(end) = segment.end_time() {
        body.push_str(&format!(
            "atrim=start={}:end={},",
            fmt_secs(segment.start_time),
            fmt_secs(end)
        ));
    }
    body.push_str(&format!(
        "asetpts=PTS-STARTPTS,aformat=sample_rates={}:channel_layouts={}",
        AUDIO_SAMPLE_RATE, AUDIO_CHANNEL_LAYOUT
    ));

    graph.add(
        vec![StreamRef::audio(file_index)],
        body,
        vec![label.to_string()],
    );
}

/// Emit the preparation chain for one image-overlay segment, producing
/// `label`.
///
/// Images are trimmed to their exact duration rather than run through a
/// loop filter; looping single-frame sources crashes some engine builds,
/// and the overlay pass repeats the last frame for as long as its enable
/// window allows. The clip's
/// transform is applied here (scale, then rotation with a transparent
/// canvas); placement happens in the overlay chain.
pub fn prepare_image_segment(graph: &mut FilterGraph, segment: &Segment, label: &str) {
    // The caller filters out sourceless segments before preparing.
    let Some(file_index) = segment.file_index else {
        return;
    };

    let mut body = String::from("format=rgba");
    if let Some(duration) = segment.duration {
        body.push_str(&format!(",trim=duration={}", fmt_secs(duration)));
    }

    let transform = segment.transform().unwrap_or_default();
    if transform.scale != 1.0 {
        body.push_str(&format!(
            ",scale=iw*{s}:ih*{s}",
            s = fmt_secs(transform.scale)
        ));
    }
    if transform.rotation != 0.0 {
        body.push_str(&format!(
            ",rotate={r}*PI/180:ow=rotw({r}*PI/180):oh=roth({r}*PI/180):c=none",
            r = fmt_secs(transform.rotation)
        ));
    }
    body.push_str(",setpts=PTS-STARTPTS");

    graph.add(
        vec![StreamRef::video(file_index)],
        body,
        vec![label.to_string()],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TimelineKind, Transform};

    fn ctx() -> SegmentCtx {
        SegmentCtx {
            canvas: Dimensions::new(1920, 1080),
            frame_rate: 30.0,
            normalize_frame_rate: true,
        }
    }

    fn real_segment(start: f64, duration: f64) -> Segment {
        Segment {
            original_index: Some(0),
            file_index: Some(2),
            start_time: start,
            duration: Some(duration),
            kind: TimelineKind::Video,
            layer: 0,
            input: None,
        }
    }

    #[test]
    fn video_segment_chain_trims_and_normalizes() {
        let mut graph = FilterGraph::new();
        prepare_video_segment(&mut graph, &real_segment(7.0, 5.0), &ctx(), "v0");
        let rendered = graph.render().unwrap();
        assert!(rendered.starts_with("[2:v]trim=start=7.000:end=12.000,setpts=PTS-STARTPTS,fps=30"));
        assert!(rendered.contains("setsar=1"));
        assert!(rendered.ends_with("[v0]"));
    }

    #[test]
    fn untimed_video_segment_skips_trim() {
        let mut segment = real_segment(0.0, 0.0);
        segment.duration = None;
        let mut graph = FilterGraph::new();
        prepare_video_segment(&mut graph, &segment, &ctx(), "v0");
        let rendered = graph.render().unwrap();
        assert!(!rendered.contains("trim="));
        assert!(rendered.contains("fps=30"));
    }

    #[test]
    fn video_gap_synthesizes_black() {
        let gap = Segment::gap(5.0, 2.0, TimelineKind::Video, 0);
        let mut graph = FilterGraph::new();
        prepare_video_segment(&mut graph, &gap, &ctx(), "g0");
        assert_eq!(
            graph.render().unwrap(),
            "color=c=black:s=1920x1080:r=30:d=2.000[g0]"
        );
    }

    #[test]
    fn audio_gap_synthesizes_silence() {
        let gap = Segment::gap(0.0, 1.5, TimelineKind::Audio, 0);
        let mut graph = FilterGraph::new();
        prepare_audio_segment(&mut graph, &gap, "s0");
        assert_eq!(
            graph.render().unwrap(),
            "anullsrc=channel_layout=stereo:sample_rate=44100,atrim=0:1.500,asetpts=PTS-STARTPTS[s0]"
        );
    }

    #[test]
    fn audio_segment_normalizes_sample_format() {
        let mut segment = real_segment(0.0, 4.0);
        segment.kind = TimelineKind::Audio;
        let mut graph = FilterGraph::new();
        prepare_audio_segment(&mut graph, &segment, "a0");
        let rendered = graph.render().unwrap();
        assert!(rendered.starts_with("[2:a]atrim=start=0.000:end=4.000,asetpts=PTS-STARTPTS"));
        assert!(rendered.contains("aformat=sample_rates=44100:channel_layouts=stereo"));
    }

    #[test]
    fn image_segment_uses_trim_not_loop() {
        let mut segment = real_segment(0.0, 3.0);
        segment.input = Some(crate::models::TrackInput::Clip(Box::new(
            crate::models::ClipInput {
                path: "/m/logo.png".into(),
                image_transform: Some(Transform {
                    scale: 0.5,
                    rotation: 90.0,
                    ..Default::default()
                }),
                ..Default::default()
            },
        )));
        let mut graph = FilterGraph::new();
        prepare_image_segment(&mut graph, &segment, "img0");
        let rendered = graph.render().unwrap();
        assert!(rendered.contains("trim=duration=3.000"));
        assert!(!rendered.contains("loop"));
        assert!(rendered.contains("scale=iw*0.500:ih*0.500"));
        assert!(rendered.contains("rotate=90.000*PI/180"));
    }
}
