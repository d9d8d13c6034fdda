//! Montage Core - timeline-to-ffmpeg export compiler
//!
//! Compiles a layered editor timeline into a single ffmpeg invocation:
//! inputs are categorized and deduplicated, per-layer timelines are built
//! and gap-filled, a validated filter graph is rendered, and the final
//! argument vector is assembled for the process runner. No UI
//! dependencies; the crate is usable from a GUI or a CLI alike.

pub mod capability;
pub mod command;
pub mod config;
pub mod export;
pub mod filtergraph;
pub mod fonts;
pub mod inputs;
pub mod logging;
pub mod models;
pub mod runner;
pub mod timeline;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
