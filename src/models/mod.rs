//! Data models for the export engine.
//!
//! This module contains the core data structures shared across the compiler
//! stages:
//! - Enums for track kinds, gap kinds and hardware families
//! - Track inputs as serialized by the editor shell
//! - Export job records (inputs + operations + output metadata)

mod enums;
mod job;
mod track;

// Re-export all public types
pub use enums::{GapKind, HwaccelKind, TimelineKind, TrackKind};
pub use job::{Dimensions, ExportJob, Operations};
pub use track::{ClipInput, TrackInput, Transform, GAP_SENTINEL};
