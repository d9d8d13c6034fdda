//! ffmpeg command-line assembly.
//!
//! Builds the argument vector for one export from a [`CompiledPlan`] and
//! the categorized inputs. Input files are deduplicated upstream; this
//! module only serializes what the compiler decided.

use std::path::PathBuf;

use crate::capability::Capabilities;
use crate::filtergraph::CompiledPlan;
use crate::inputs::CategorizedInputs;
use crate::models::ExportJob;

/// Software encode defaults applied when no hardware family is active.
const SOFTWARE_CRF: &str = "23";
const SOFTWARE_PRESET: &str = "medium";
const AUDIO_BITRATE: &str = "192k";

/// Builder for ffmpeg command-line tokens.
///
/// Generates a list of string tokens ready to pass to the engine binary,
/// without the binary name itself.
pub struct FfmpegCommandBuilder<'a> {
    job: &'a ExportJob,
    categorized: &'a CategorizedInputs,
    plan: &'a CompiledPlan,
    caps: &'a Capabilities,
}

impl<'a> FfmpegCommandBuilder<'a> {
    pub fn new(
        job: &'a ExportJob,
        categorized: &'a CategorizedInputs,
        plan: &'a CompiledPlan,
        caps: &'a Capabilities,
    ) -> Self {
        Self {
            job,
            categorized,
            plan,
            caps,
        }
    }

    /// Build the complete argument vector.
    pub fn build(&self) -> Vec<String> {
        let mut tokens = Vec::new();

        tokens.push("-y".to_string());
        tokens.push("-hide_banner".to_string());
        self.add_tuning_flags(&mut tokens);

        for flag in &self.caps.global_flags {
            tokens.push(flag.clone());
        }

        for path in self.categorized.files() {
            tokens.push("-i".to_string());
            tokens.push(path.to_string_lossy().to_string());
        }

        match &self.plan.filtergraph {
            Some(graph) => {
                tokens.push("-filter_complex".to_string());
                tokens.push(graph.clone());
                if let Some(map) = &self.plan.video_map {
                    tokens.push("-map".to_string());
                    tokens.push(map.clone());
                }
                if let Some(map) = &self.plan.audio_map {
                    tokens.push("-map".to_string());
                    tokens.push(map.clone());
                }
                self.add_codec_flags(&mut tokens);
                tokens.push("-r".to_string());
                tokens.push(format!("{}", self.job.target_frame_rate()));
                if self.plan.shortest {
                    tokens.push("-shortest".to_string());
                }
            }
            None => {
                // Plain single-input job: remux without touching the streams.
                tokens.push("-c".to_string());
                tokens.push("copy".to_string());
            }
        }

        if let Some(threads) = self.job.operations.threads {
            tokens.push("-threads".to_string());
            tokens.push(threads.to_string());
        }

        tokens.push(self.output_path().to_string_lossy().to_string());
        tokens
    }

    /// Demuxer probing limits, raised so long multi-stream inputs still
    /// get their parameters detected up front.
    fn add_tuning_flags(&self, tokens: &mut Vec<String>) {
        tokens.push("-probesize".to_string());
        tokens.push("50M".to_string());
        tokens.push("-analyzeduration".to_string());
        tokens.push("100M".to_string());
    }

    fn add_codec_flags(&self, tokens: &mut Vec<String>) {
        tokens.push("-c:v".to_string());
        tokens.push(self.caps.selected_codec().to_string());

        if self.caps.is_hardware() {
            for flag in &self.caps.encoder_flags {
                tokens.push(flag.clone());
            }
        } else {
            let preset = self
                .job
                .operations
                .preset
                .as_deref()
                .unwrap_or(SOFTWARE_PRESET);
            tokens.push("-preset".to_string());
            tokens.push(preset.to_string());
            tokens.push("-crf".to_string());
            tokens.push(SOFTWARE_CRF.to_string());
            tokens.push("-pix_fmt".to_string());
            tokens.push("yuv420p".to_string());
        }

        if self.plan.audio_map.is_some() {
            tokens.push("-c:a".to_string());
            tokens.push("aac".to_string());
            tokens.push("-b:a".to_string());
            tokens.push(AUDIO_BITRATE.to_string());
        }
    }

    fn output_path(&self) -> PathBuf {
        self.job.output_file()
    }
}

/// Format tokens for log display, quoting anything the shell would split.
pub fn format_tokens_pretty(binary: &str, tokens: &[String]) -> String {
    let mut out = String::from(binary);
    for token in tokens {
        out.push(' ');
        if token.contains(' ') || token.contains(';') || token.contains('\'') {
            out.push('"');
            out.push_str(&token.replace('"', "\\\""));
            out.push('"');
        } else {
            out.push_str(token);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Detection;
    use crate::filtergraph::GraphCompiler;
    use crate::models::{ClipInput, Dimensions, HwaccelKind, TrackInput, TrackKind};

    fn timed_clip(path: &str, start: f64, duration: f64) -> TrackInput {
        TrackInput::Clip(Box::new(ClipInput {
            path: path.into(),
            start_time: Some(start),
            duration: Some(duration),
            track_type: Some(TrackKind::Video),
            ..ClipInput::default()
        }))
    }

    fn compile_job(job: &ExportJob, caps: &Capabilities) -> (CategorizedInputs, CompiledPlan) {
        GraphCompiler::new(job, caps, &[])
            .compile()
            .unwrap()
    }

    #[test]
    fn plain_job_copies_streams_without_graph() {
        let job = ExportJob::new(vec![TrackInput::from("/media/a.mp4")], "out.mp4");
        let caps = Capabilities::software(false);
        let (cat, plan) = compile_job(&job, &caps);
        let tokens = FfmpegCommandBuilder::new(&job, &cat, &plan, &caps).build();

        assert!(!tokens.iter().any(|t| t == "-filter_complex"));
        assert!(tokens.windows(2).any(|w| w[0] == "-i" && w[1] == "/media/a.mp4"));
        assert!(tokens.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
        assert_eq!(tokens.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn concat_job_maps_both_outputs() {
        let mut job = ExportJob::new(
            vec![
                timed_clip("/media/a.mp4", 0.0, 150.0),
                timed_clip("/media/b.mp4", 150.0, 150.0),
            ],
            "out.mp4",
        );
        job.operations.concat = true;
        job.operations.normalize_frame_rate = true;
        job.operations.target_frame_rate = Some(30.0);
        let caps = Capabilities::software(false);
        let (cat, plan) = compile_job(&job, &caps);
        let tokens = FfmpegCommandBuilder::new(&job, &cat, &plan, &caps).build();

        let fc = tokens.iter().position(|t| t == "-filter_complex").unwrap();
        assert!(tokens[fc + 1].contains("concat=n=2:v=1:a=1"));
        assert!(tokens.windows(2).any(|w| w[0] == "-map" && w[1] == "[outv]"));
        assert!(tokens.windows(2).any(|w| w[0] == "-map" && w[1] == "[outa]"));
        assert!(tokens.windows(2).any(|w| w[0] == "-r" && w[1] == "30"));
    }

    #[test]
    fn shared_path_emits_single_input_flag() {
        let mut job = ExportJob::new(
            vec![
                timed_clip("/media/a.mp4", 0.0, 150.0),
                timed_clip("/media/a.mp4", 150.0, 150.0),
            ],
            "out.mp4",
        );
        job.operations.concat = true;
        let caps = Capabilities::software(false);
        let (cat, plan) = compile_job(&job, &caps);
        let tokens = FfmpegCommandBuilder::new(&job, &cat, &plan, &caps).build();

        let input_count = tokens
            .windows(2)
            .filter(|w| w[0] == "-i" && w[1] == "/media/a.mp4")
            .count();
        assert_eq!(input_count, 1);
    }

    #[test]
    fn unavailable_hardware_falls_back_to_software_flags() {
        let mut job = ExportJob::new(
            vec![timed_clip("/media/a.mp4", 0.0, 150.0)],
            "out.mp4",
        );
        job.operations.trim = true;
        job.operations.use_hardware_acceleration = true;
        job.operations.hwaccel_type = Some(HwaccelKind::Nvenc);

        // Host reports no encoders at all.
        let caps = Detection::default().resolve(Some(HwaccelKind::Nvenc), false);
        let (cat, plan) = compile_job(&job, &caps);
        let tokens = FfmpegCommandBuilder::new(&job, &cat, &plan, &caps).build();

        assert!(tokens.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
        assert!(tokens.windows(2).any(|w| w[0] == "-crf" && w[1] == "23"));
        assert!(!tokens.iter().any(|t| t.contains("nvenc")));
    }

    #[test]
    fn hardware_caps_suppress_software_rate_control() {
        let mut job = ExportJob::new(
            vec![timed_clip("/media/a.mp4", 0.0, 150.0)],
            "out.mp4",
        );
        job.operations.trim = true;
        let caps = Capabilities::for_kind(HwaccelKind::Nvenc, false);
        let (cat, plan) = compile_job(&job, &caps);
        let tokens = FfmpegCommandBuilder::new(&job, &cat, &plan, &caps).build();

        assert!(tokens.windows(2).any(|w| w[0] == "-c:v" && w[1] == "h264_nvenc"));
        assert!(!tokens.iter().any(|t| t == "-crf"));
        assert!(!tokens.iter().any(|t| t == "-pix_fmt"));
    }

    #[test]
    fn untimed_audio_job_gets_shortest_flag() {
        let job = ExportJob::new(vec![TrackInput::from("/media/song.mp3")], "out.mp4");
        let caps = Capabilities::software(false);
        let (cat, plan) = compile_job(&job, &caps);
        assert!(plan.shortest);
        let tokens = FfmpegCommandBuilder::new(&job, &cat, &plan, &caps).build();
        assert!(tokens.iter().any(|t| t == "-shortest"));
    }

    #[test]
    fn determinism_same_job_same_tokens() {
        let mut job = ExportJob::new(
            vec![
                timed_clip("/media/a.mp4", 0.0, 150.0),
                timed_clip("/media/b.mp4", 150.0, 60.0),
            ],
            "out.mp4",
        );
        job.operations.concat = true;
        job.video_dimensions = Some(Dimensions::new(1280, 720));
        let caps = Capabilities::software(false);

        let (cat_a, plan_a) = compile_job(&job, &caps);
        let (cat_b, plan_b) = compile_job(&job, &caps);
        let a = FfmpegCommandBuilder::new(&job, &cat_a, &plan_a, &caps).build();
        let b = FfmpegCommandBuilder::new(&job, &cat_b, &plan_b, &caps).build();
        assert_eq!(a, b);
    }

    #[test]
    fn pretty_format_quotes_graph_text() {
        let tokens = vec![
            "-filter_complex".to_string(),
            "[0:v]trim=0:5[v0];[v0]setsar=1[outv]".to_string(),
        ];
        let line = format_tokens_pretty("ffmpeg", &tokens);
        assert!(line.starts_with("ffmpeg -filter_complex \""));
        assert!(line.ends_with('"'));
    }

    #[test]
    fn threads_flag_passes_through() {
        let mut job = ExportJob::new(
            vec![timed_clip("/media/a.mp4", 0.0, 150.0)],
            "out.mp4",
        );
        job.operations.trim = true;
        job.operations.threads = Some(4);
        let caps = Capabilities::software(false);
        let (cat, plan) = compile_job(&job, &caps);
        let tokens = FfmpegCommandBuilder::new(&job, &cat, &plan, &caps).build();
        assert!(tokens.windows(2).any(|w| w[0] == "-threads" && w[1] == "4"));
    }
}
