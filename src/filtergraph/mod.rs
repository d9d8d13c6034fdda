//! Filter graph construction and rendering.
//!
//! `graph` holds the validated DAG representation, `segments` prepares
//! per-clip filter chains, `aspect` plans ratio conversion, and `compile`
//! runs the full pipeline from an [`crate::models::ExportJob`] to a
//! rendered `-filter_complex` string with map targets.

pub mod aspect;
pub mod compile;
pub mod graph;
pub mod segments;

pub use aspect::{parse_aspect, plan_aspect, AspectStrategy, CropWindow};
pub use compile::{
    CompileError, CompiledPlan, CompositionMode, GraphCompiler, AUDIO_OUT, VIDEO_OUT,
};
pub use graph::{FilterChain, FilterGraph, GraphError, StreamRef};
pub use segments::{SegmentCtx, AUDIO_CHANNEL_LAYOUT, AUDIO_SAMPLE_RATE};
