//! The codegen pass: timelines to one filter graph.
//!
//! Ordered pipeline of graph-construction phases, each consuming the
//! terminal label of the previous one: per-segment preparation, per-layer
//! concatenation, layer compositing, aspect conversion, image overlays,
//! final output scaling, subtitle overlay, and the hardware upload
//! post-pass. A trivial job compiles to no graph at all.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::capability::Capabilities;
use crate::inputs::{categorize, CategorizedInputs};
use crate::models::{Dimensions, ExportJob, Transform};
use crate::timeline::{build_timelines, fill_required_gaps, Segment, Timeline, TimelineSet};

use super::aspect::{parse_aspect, plan_aspect, AspectStrategy};
use super::graph::{FilterGraph, GraphError, StreamRef};
use super::segments::{
    fmt_secs, prepare_audio_segment, prepare_image_segment, prepare_video_segment, SegmentCtx,
};

/// Canvas used when neither the job nor any clip declares dimensions.
const DEFAULT_CANVAS: Dimensions = Dimensions {
    width: 1920,
    height: 1080,
};

/// Terminal label names expected by the command assembler.
pub const VIDEO_OUT: &str = "outv";
pub const AUDIO_OUT: &str = "outa";

/// Errors from graph compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Job has no usable inputs")]
    EmptyJob,

    #[error("Compiled graph failed validation: {0}")]
    Graph(#[from] GraphError),
}

/// Shape of the audio/video branch structure, decided once and matched
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionMode {
    /// One video layer whose segments pair 1:1 with the audio track: a
    /// single interleaved `concat=v=1:a=1` node.
    UnifiedAv,
    /// Independent video and audio branches.
    SplitAv,
    /// No audio-bearing input; the audio map is omitted.
    VideoOnly,
    /// No video or image input; a solid background is synthesized so the
    /// graph always has a video branch.
    AudioOnly,
    /// The job needs no re-encode; streams are copied without a graph.
    Passthrough,
}

/// Result of compiling one job.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPlan {
    /// Rendered `-filter_complex` text; `None` for the trivial passthrough
    /// job.
    pub filtergraph: Option<String>,
    /// `-map` target for video, e.g. `"[outv]"`.
    pub video_map: Option<String>,
    /// `-map` target for audio; absent for silent output.
    pub audio_map: Option<String>,
    /// The synthesized video branch has no fixed duration; the assembler
    /// must bound the output with `-shortest`.
    pub shortest: bool,
    pub mode: CompositionMode,
}

impl CompiledPlan {
    fn passthrough() -> Self {
        Self {
            filtergraph: None,
            video_map: None,
            audio_map: None,
            shortest: false,
            mode: CompositionMode::Passthrough,
        }
    }
}

/// Compiles one job into a filter graph and map targets.
pub struct GraphCompiler<'a> {
    job: &'a ExportJob,
    caps: &'a Capabilities,
    /// Font directories for the subtitle pass, resolved by the caller from
    /// the job's font families.
    font_dirs: &'a [PathBuf],
}

impl<'a> GraphCompiler<'a> {
    pub fn new(job: &'a ExportJob, caps: &'a Capabilities, font_dirs: &'a [PathBuf]) -> Self {
        Self {
            job,
            caps,
            font_dirs,
        }
    }

    /// Categorize, build timelines, fill gaps, and compile the graph.
    ///
    /// Pure and deterministic: the same job always yields byte-identical
    /// output.
    pub fn compile(&self) -> Result<(CategorizedInputs, CompiledPlan), CompileError> {
        let categorized = categorize(&self.job.inputs);
        if categorized.video_inputs.is_empty() && categorized.audio_inputs.is_empty() {
            return Err(CompileError::EmptyJob);
        }

        if is_passthrough(self.job, &categorized) {
            tracing::debug!("Trivial job; compiling without a filter graph");
            return Ok((categorized, CompiledPlan::passthrough()));
        }

        let fps = self.job.target_frame_rate();
        let mut set = build_timelines(&categorized, fps, self.job.operations.replace_audio);
        fill_required_gaps(&mut set, fps);
        drop_unresolvable(&mut set, categorized.file_count());

        let plan = self.compile_timelines(&set, &categorized)?;
        Ok((categorized, plan))
    }

    fn compile_timelines(
        &self,
        set: &TimelineSet,
        categorized: &CategorizedInputs,
    ) -> Result<CompiledPlan, CompileError> {
        let ops = &self.job.operations;
        let fps = self.job.target_frame_rate();
        let canvas = source_canvas(self.job, set);
        let desired = desired_dimensions(self.job, canvas);
        let ctx = SegmentCtx {
            canvas,
            frame_rate: fps,
            normalize_frame_rate: ops.normalize_frame_rate,
        };

        let mode = select_mode(set);
        if mode == CompositionMode::AudioOnly && set.audio.is_empty() {
            return Err(CompileError::EmptyJob);
        }

        let mut graph = FilterGraph::new();
        let total = set.span_end();
        let mut shortest = false;

        // Phases 1-3: segment prep, per-layer concat, layer compositing.
        let (mut video_label, mut audio_label) = match mode {
            CompositionMode::Passthrough => return Ok(CompiledPlan::passthrough()),
            CompositionMode::UnifiedAv => {
                let Some(layer) = set.video_layers.values().next() else {
                    return Err(CompileError::EmptyJob);
                };
                let (v, a) = emit_unified(&mut graph, layer, &set.audio, &ctx);
                (v, Some(a))
            }
            CompositionMode::SplitAv => {
                let v = emit_video_stack(&mut graph, set, &ctx, total);
                let a = emit_audio_track(&mut graph, set);
                (v, Some(a))
            }
            CompositionMode::VideoOnly => {
                (emit_video_stack(&mut graph, set, &ctx, total), None)
            }
            CompositionMode::AudioOnly => {
                let a = emit_audio_track(&mut graph, set);
                let duration = set.audio.total_duration;
                // An untimed audio source has no measured duration; emit an
                // unbounded background and let `-shortest` end the output
                // with the audio stream.
                let body = if duration > 0.0 {
                    format!(
                        "color=c=black:s={}:r={}:d={}",
                        canvas,
                        fps,
                        fmt_secs(duration)
                    )
                } else {
                    shortest = true;
                    format!("color=c=black:s={}:r={}", canvas, fps)
                };
                graph.add(Vec::new(), body, vec!["base".to_string()]);
                ("base".to_string(), Some(a))
            }
        };

        // Phase 4: aspect conversion.
        let first_transform = first_visible_transform(set);
        let mut current_dims = canvas;
        match plan_aspect(canvas, desired, first_transform) {
            AspectStrategy::Passthrough | AspectStrategy::Letterbox => {}
            AspectStrategy::Crop(w) => {
                graph.add(
                    vec![StreamRef::label(video_label.as_str())],
                    format!("crop={}:{}:{}:{}", w.width, w.height, w.x, w.y),
                    vec!["fit".to_string()],
                );
                video_label = "fit".to_string();
                current_dims = Dimensions::new(w.width, w.height);
            }
            AspectStrategy::TransformComposite(t) => {
                video_label =
                    emit_transform_composite(&mut graph, &video_label, t, desired, fps, total);
                current_dims = desired;
            }
        }

        // Phase 5: image overlays, time-gated rather than concatenated.
        video_label = emit_image_overlays(&mut graph, set, categorized, video_label);

        // Phase 6: final output scale.
        if current_dims != desired {
            graph.add(
                vec![StreamRef::label(video_label.as_str())],
                format!(
                    "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black",
                    w = desired.width,
                    h = desired.height
                ),
                vec!["sized".to_string()],
            );
            video_label = "sized".to_string();
        }

        // Phase 7: subtitle overlay, last so coordinates are
        // output-resolution relative.
        if let Some(subtitle_path) = &ops.subtitles {
            graph.add(
                vec![StreamRef::label(video_label.as_str())],
                subtitle_filter(subtitle_path, self.font_dirs),
                vec!["subbed".to_string()],
            );
            video_label = "subbed".to_string();
        }

        // Phase 8: explicit device upload for the one family that needs it.
        if self.caps.kind.needs_upload() {
            graph.add(
                vec![StreamRef::label(video_label.as_str())],
                "format=nv12,hwupload",
                vec!["hw".to_string()],
            );
            video_label = "hw".to_string();
        }

        graph.rename_label(&video_label, VIDEO_OUT);
        if let Some(a) = &audio_label {
            graph.rename_label(a, AUDIO_OUT);
            audio_label = Some(AUDIO_OUT.to_string());
        }

        Ok(CompiledPlan {
            filtergraph: Some(graph.render()?),
            video_map: Some(format!("[{}]", VIDEO_OUT)),
            audio_map: audio_label.map(|a| format!("[{}]", a)),
            shortest,
            mode,
        })
    }
}

/// Decide the branch structure for this job.
fn select_mode(set: &TimelineSet) -> CompositionMode {
    if !set.has_video_content() {
        return CompositionMode::AudioOnly;
    }
    if set.audio.is_empty() && set.audio_overlays.is_empty() {
        return CompositionMode::VideoOnly;
    }
    if set.video_layers.len() == 1 && set.audio_overlays.is_empty() && segments_pair(set) {
        return CompositionMode::UnifiedAv;
    }
    CompositionMode::SplitAv
}

/// True when the single video layer's segments mirror the audio track
/// segment-for-segment (same file, same window), allowing one interleaved
/// concat node.
fn segments_pair(set: &TimelineSet) -> bool {
    let Some(layer) = set.video_layers.values().next() else {
        return false;
    };
    if layer.segments.len() != set.audio.segments.len() {
        return false;
    }
    layer
        .segments
        .iter()
        .zip(&set.audio.segments)
        .all(|(v, a)| {
            v.file_index == a.file_index
                && v.start_time == a.start_time
                && v.duration == a.duration
        })
}

/// The trivial job: one real video input, default placement, no operations
/// and no canvas change.
fn is_passthrough(job: &ExportJob, categorized: &CategorizedInputs) -> bool {
    if !job.operations.is_plain()
        || job.video_dimensions.is_some()
        || categorized.file_count() != 1
        || categorized.video_inputs.len() != 1
        || !categorized.audio_inputs.is_empty()
    {
        return false;
    }
    let entry = &categorized.video_inputs[0];
    if entry.is_gap() || entry.class != crate::inputs::MediaClass::Video {
        return false;
    }
    let untimed = entry
        .input
        .as_clip()
        .map(|c| c.start_time.is_none() && c.end_time.is_none() && c.duration.is_none())
        .unwrap_or(true);
    untimed && entry.input.transform().map_or(true, |t| t.is_identity())
}

/// Drop segments whose file index no longer matches a categorized input.
/// The export proceeds visibly incomplete rather than failing outright.
fn drop_unresolvable(set: &mut TimelineSet, file_count: usize) {
    let mut dropped = 0usize;
    let mut sweep = |timeline: &mut Timeline| {
        timeline.segments.retain(|s| {
            let ok = s.file_index.map_or(true, |idx| idx < file_count);
            if !ok {
                dropped += 1;
            }
            ok
        });
    };
    for timeline in set.video_layers.values_mut() {
        sweep(timeline);
    }
    for timeline in set.image_layers.values_mut() {
        sweep(timeline);
    }
    sweep(&mut set.audio);
    set.audio_overlays.retain(|s| {
        let ok = s.file_index.map_or(true, |idx| idx < file_count);
        if !ok {
            dropped += 1;
        }
        ok
    });
    if dropped > 0 {
        tracing::warn!(
            "Dropped {} segment(s) with unresolvable file indices; output will be incomplete",
            dropped
        );
    }
}

/// Canvas the segments are normalized to: first video clip's declared
/// dimensions, then the job's output dimensions, then the project default.
fn source_canvas(job: &ExportJob, set: &TimelineSet) -> Dimensions {
    set.video_layers
        .values()
        .flat_map(|t| t.segments.iter())
        .find_map(Segment::declared_dimensions)
        .map(|(w, h)| Dimensions::new(w, h))
        .or(job.video_dimensions)
        .unwrap_or(DEFAULT_CANVAS)
}

fn desired_dimensions(job: &ExportJob, canvas: Dimensions) -> Dimensions {
    if let Some(dims) = job.video_dimensions {
        return dims;
    }
    if let Some(ratio) = job
        .operations
        .aspect
        .as_deref()
        .and_then(parse_aspect)
    {
        // Keep the canvas height and derive the width from the ratio.
        let width = (canvas.height as f64 * ratio).round() as u32;
        return Dimensions::new(width, canvas.height);
    }
    canvas
}

fn first_visible_transform(set: &TimelineSet) -> Option<Transform> {
    set.video_layers
        .values()
        .flat_map(|t| t.segments.iter())
        .find(|s| !s.is_gap())
        .and_then(Segment::transform)
}

/// Unified mode: interleaved `[v][a]` pairs into one concat node.
fn emit_unified(
    graph: &mut FilterGraph,
    layer: &Timeline,
    audio: &Timeline,
    ctx: &SegmentCtx,
) -> (String, String) {
    let mut pair_labels = Vec::new();
    for (n, (v, a)) in layer.segments.iter().zip(&audio.segments).enumerate() {
        let v_label = format!("uv{}", n);
        let a_label = format!("ua{}", n);
        prepare_video_segment(graph, v, ctx, &v_label);
        prepare_audio_segment(graph, a, &a_label);
        pair_labels.push((v_label, a_label));
    }

    if pair_labels.len() == 1 {
        if let Some((v, a)) = pair_labels.pop() {
            return (v, a);
        }
    }

    let inputs = pair_labels
        .iter()
        .flat_map(|(v, a)| [StreamRef::label(v.as_str()), StreamRef::label(a.as_str())])
        .collect();
    graph.add(
        inputs,
        format!("concat=n={}:v=1:a=1", pair_labels.len()),
        vec!["vcat".to_string(), "acat".to_string()],
    );
    ("vcat".to_string(), "acat".to_string())
}

/// Split/video-only mode: concat the gap-filled background layer, then
/// overlay every upper-layer segment independently.
///
/// Upper layers are sparse and may have non-contiguous segments: each one
/// is shifted to its declared placement and gated to its own time window,
/// so the background shows through wherever no upper segment is declared.
fn emit_video_stack(
    graph: &mut FilterGraph,
    set: &TimelineSet,
    ctx: &SegmentCtx,
    total: f64,
) -> String {
    let background = set.background_layer();
    let mut current: Option<String> = None;

    if let Some(timeline) = background.and_then(|n| set.video_layers.get(&n)) {
        if !timeline.is_empty() {
            let mut seg_labels = Vec::new();
            for (n, segment) in timeline.segments.iter().enumerate() {
                let label = format!("bg{}", n);
                prepare_video_segment(graph, segment, ctx, &label);
                seg_labels.push(label);
            }

            let cat_label = "bgcat".to_string();
            if seg_labels.len() == 1 {
                // concat wants at least two inputs; pass a lone segment
                // through.
                graph.add(
                    vec![StreamRef::label(seg_labels[0].as_str())],
                    "null",
                    vec![cat_label.clone()],
                );
            } else {
                graph.add(
                    seg_labels.iter().map(|l| StreamRef::label(l.as_str())).collect(),
                    format!("concat=n={}:v=1:a=0", seg_labels.len()),
                    vec![cat_label.clone()],
                );
            }
            current = Some(cat_label);
        }
    }

    let mut current = match current {
        Some(label) => label,
        None => {
            // Image-only job: synthesize the background the overlays sit on.
            graph.add(
                Vec::new(),
                format!(
                    "color=c=black:s={}:r={}:d={}",
                    ctx.canvas,
                    ctx.frame_rate,
                    fmt_secs(total)
                ),
                vec!["base".to_string()],
            );
            "base".to_string()
        }
    };

    let mut k = 0usize;
    for (layer_no, timeline) in &set.video_layers {
        if Some(*layer_no) == background {
            continue;
        }
        for segment in &timeline.segments {
            if segment.is_gap() {
                // A gap on an upper layer is transparent, not black.
                continue;
            }
            let label = format!("l{}s{}", layer_no, k);
            prepare_video_segment(graph, segment, ctx, &label);

            let delayed = format!("d{}", k);
            graph.add(
                vec![StreamRef::label(label.as_str())],
                format!("setpts=PTS+{}/TB", fmt_secs(segment.start_time)),
                vec![delayed.clone()],
            );

            let enable = match segment.end_time() {
                Some(end) => format!(
                    "between(t,{},{})",
                    fmt_secs(segment.start_time),
                    fmt_secs(end)
                ),
                None => format!("gte(t,{})", fmt_secs(segment.start_time)),
            };
            let out = format!("mix{}", k);
            graph.add(
                vec![StreamRef::label(current.as_str()), StreamRef::label(delayed.as_str())],
                format!(
                    "overlay=(main_w-overlay_w)/2:(main_h-overlay_h)/2:eof_action=pass:enable='{}'",
                    enable
                ),
                vec![out.clone()],
            );
            current = out;
            k += 1;
        }
    }
    current
}

/// Concat the gap-filled audio lane, then mix any overlapping segments on
/// top: each overlap keeps its original trim window and is delayed to its
/// declared placement before an `amix`.
fn emit_audio_track(graph: &mut FilterGraph, set: &TimelineSet) -> String {
    let mut seg_labels = Vec::new();
    for (n, segment) in set.audio.segments.iter().enumerate() {
        let label = format!("as{}", n);
        prepare_audio_segment(graph, segment, &label);
        seg_labels.push(label);
    }

    let mut current = "acat".to_string();
    if seg_labels.len() == 1 {
        graph.add(
            vec![StreamRef::label(seg_labels[0].as_str())],
            "anull",
            vec![current.clone()],
        );
    } else {
        graph.add(
            seg_labels.iter().map(|l| StreamRef::label(l.as_str())).collect(),
            format!("concat=n={}:v=0:a=1", seg_labels.len()),
            vec![current.clone()],
        );
    }

    for (n, segment) in set.audio_overlays.iter().enumerate() {
        let prep = format!("ao{}", n);
        prepare_audio_segment(graph, segment, &prep);

        let delayed = format!("ad{}", n);
        let ms = (segment.start_time * 1000.0).round() as i64;
        graph.add(
            vec![StreamRef::label(prep.as_str())],
            format!("adelay=delays={}:all=1", ms),
            vec![delayed.clone()],
        );

        let out = format!("amix{}", n);
        graph.add(
            vec![StreamRef::label(current.as_str()), StreamRef::label(delayed.as_str())],
            "amix=inputs=2:duration=first:dropout_transition=0",
            vec![out.clone()],
        );
        current = out;
    }
    current
}

/// Transform path: black canvas at target size, stream scaled/positioned
/// onto it. Cropping and transform-positioning never combine.
fn emit_transform_composite(
    graph: &mut FilterGraph,
    video_label: &str,
    transform: Transform,
    desired: Dimensions,
    fps: f64,
    total: f64,
) -> String {
    graph.add(
        Vec::new(),
        format!(
            "color=c=black:s={}:r={}:d={}",
            desired,
            fps,
            fmt_secs(total)
        ),
        vec!["cbg".to_string()],
    );
    graph.add(
        vec![StreamRef::label(video_label)],
        format!("scale=iw*{s}:ih*{s}", s = fmt_secs(transform.scale)),
        vec!["txv".to_string()],
    );

    let dx = transform.x * desired.width as f64 / 2.0;
    let dy = transform.y * desired.height as f64 / 2.0;
    graph.add(
        vec![StreamRef::label("cbg"), StreamRef::label("txv")],
        format!(
            "overlay=(main_w-overlay_w)/2+{}:(main_h-overlay_h)/2+{}:shortest=1",
            fmt_secs(dx),
            fmt_secs(dy)
        ),
        vec!["fit".to_string()],
    );
    "fit".to_string()
}

/// Overlay every image segment independently with time-gated visibility, so
/// sparse image layers stay precisely timed without concatenation.
fn emit_image_overlays(
    graph: &mut FilterGraph,
    set: &TimelineSet,
    categorized: &CategorizedInputs,
    mut current: String,
) -> String {
    let mut n = 0usize;
    for timeline in set.image_layers.values() {
        for segment in &timeline.segments {
            let Some(file_index) = segment.file_index else {
                continue;
            };
            if file_index >= categorized.file_count() {
                tracing::warn!("Skipping image segment with unresolvable file index");
                continue;
            }
            let Some(end) = segment.end_time() else {
                tracing::warn!("Skipping image segment without a duration");
                continue;
            };

            let prep = format!("img{}", n);
            prepare_image_segment(graph, segment, &prep);

            let transform = segment.transform().unwrap_or_default();
            let out = format!("ovr{}", n);
            graph.add(
                vec![StreamRef::label(current.as_str()), StreamRef::label(prep.as_str())],
                format!(
                    "overlay=(main_w-overlay_w)/2+{}*main_w/2:(main_h-overlay_h)/2+{}*main_h/2:eof_action=repeat:enable='between(t,{},{})'",
                    fmt_secs(transform.x),
                    fmt_secs(transform.y),
                    fmt_secs(segment.start_time),
                    fmt_secs(end)
                ),
                vec![out.clone()],
            );
            current = out;
            n += 1;
        }
    }
    current
}

/// Subtitle filter with a font-directory search parameter.
fn subtitle_filter(subtitle_path: &Path, font_dirs: &[PathBuf]) -> String {
    let mut body = format!("subtitles=filename='{}'", subtitle_path.display());
    if let Some(dir) = font_dirs.first() {
        body.push_str(&format!(":fontsdir='{}'", dir.display()));
    }
    body
}
