//! Hardware acceleration capability detection.
//!
//! Probes the engine binary once per unique path for available hardware
//! encoder families and resolves job requests against the result, falling
//! back through the priority chain to software.

mod detect;
mod types;

pub use detect::{parse_encoder_list, probe_encoders, CapabilityCache};
pub use types::{Capabilities, Detection};
