//! Timeline construction and gap filling.
//!
//! Converts categorized inputs into per-layer ordered segment lists, then
//! guarantees contiguous coverage for the background layer and the audio
//! track.

mod builder;
mod gaps;
mod types;

pub use builder::{build_timelines, TimelineSet};
pub use gaps::{extract_overlaps, fill_gaps, fill_required_gaps};
pub use types::{Segment, Timeline};
