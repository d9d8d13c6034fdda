//! Export planning: one job in, one ready-to-run command out.
//!
//! Ties the per-concern services together in the order an export needs
//! them: capability resolution against the engine binary, font directory
//! lookup for the job's subtitle families, graph compilation, and command
//! assembly. The runner takes the resulting tokens as-is.

use std::path::Path;

use crate::capability::{Capabilities, CapabilityCache};
use crate::command::FfmpegCommandBuilder;
use crate::filtergraph::{CompileError, CompiledPlan, GraphCompiler};
use crate::fonts::FontCatalog;
use crate::inputs::CategorizedInputs;
use crate::models::ExportJob;

/// Everything resolved for one export, ready for the runner.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub caps: Capabilities,
    pub categorized: CategorizedInputs,
    pub plan: CompiledPlan,
    /// Argument vector for the engine binary.
    pub tokens: Vec<String>,
}

/// Resolve capabilities and fonts for `job`, then compile and assemble it.
///
/// A job with hardware acceleration switched off never touches the
/// capability cache; it encodes in software even when the host advertises
/// hardware families.
pub fn plan_export(
    job: &ExportJob,
    engine_binary: &Path,
    capabilities: &CapabilityCache,
    fonts: &FontCatalog,
) -> Result<ExportPlan, CompileError> {
    let caps = if job.operations.use_hardware_acceleration {
        capabilities
            .detect(engine_binary)
            .resolve(job.operations.hwaccel_type, job.operations.prefer_hevc)
    } else {
        Capabilities::software(job.operations.prefer_hevc)
    };

    let font_dirs = if job.subtitle_font_families.is_empty() {
        Vec::new()
    } else {
        fonts.dirs_for_families(&job.subtitle_font_families)
    };

    tracing::debug!(
        "Planning export to {} with codec {}",
        job.output,
        caps.selected_codec()
    );

    let compiler = GraphCompiler::new(job, &caps, &font_dirs);
    let (categorized, plan) = compiler.compile()?;
    let tokens = FfmpegCommandBuilder::new(job, &categorized, &plan, &caps).build();

    Ok(ExportPlan {
        caps,
        categorized,
        plan,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Detection;
    use crate::models::{ClipInput, HwaccelKind, TrackInput};
    use std::path::PathBuf;

    fn trimmed_job() -> ExportJob {
        let clip = TrackInput::Clip(Box::new(ClipInput {
            path: PathBuf::from("/m/a.mp4"),
            start_time: Some(0.0),
            end_time: Some(300.0),
            ..Default::default()
        }));
        let mut job = ExportJob::new(vec![clip], "out.mp4");
        job.operations.trim = true;
        job
    }

    fn seeded_cache() -> CapabilityCache {
        let cache = CapabilityCache::new();
        cache.seed(
            "/usr/bin/ffmpeg",
            Detection {
                available: vec![HwaccelKind::Nvenc],
            },
        );
        cache
    }

    #[test]
    fn disabled_hardware_stays_software_despite_available_encoders() {
        let mut job = trimmed_job();
        job.operations.use_hardware_acceleration = false;
        job.operations.hwaccel_type = Some(HwaccelKind::Nvenc);

        let plan = plan_export(
            &job,
            Path::new("/usr/bin/ffmpeg"),
            &seeded_cache(),
            &FontCatalog::new(Vec::new()),
        )
        .unwrap();

        assert!(!plan.caps.is_hardware());
        assert!(plan.tokens.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
        assert!(!plan.tokens.iter().any(|t| t.contains("nvenc")));
    }

    #[test]
    fn enabled_hardware_resolves_through_the_cache() {
        let mut job = trimmed_job();
        job.operations.use_hardware_acceleration = true;
        job.operations.hwaccel_type = Some(HwaccelKind::Nvenc);

        let plan = plan_export(
            &job,
            Path::new("/usr/bin/ffmpeg"),
            &seeded_cache(),
            &FontCatalog::new(Vec::new()),
        )
        .unwrap();

        assert_eq!(plan.caps.kind, HwaccelKind::Nvenc);
        assert!(plan.tokens.windows(2).any(|w| w[0] == "-c:v" && w[1] == "h264_nvenc"));
    }

    #[test]
    fn font_families_resolve_into_the_subtitle_pass() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("MyFont-Regular.ttf"), b"stub").unwrap();

        let mut job = trimmed_job();
        job.operations.subtitles = Some(PathBuf::from("/tmp/subs.ass"));
        job.subtitle_font_families = vec!["MyFont".to_string()];

        let fonts = FontCatalog::new(vec![dir.path().to_path_buf()]);
        let plan = plan_export(
            &job,
            Path::new("/usr/bin/ffmpeg"),
            &CapabilityCache::new(),
            &fonts,
        )
        .unwrap();

        let graph = plan.plan.filtergraph.unwrap();
        assert!(graph.contains("fontsdir="));
        assert!(graph.contains(&dir.path().display().to_string()));
    }
}
