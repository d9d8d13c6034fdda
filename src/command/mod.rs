//! ffmpeg argument vector assembly.

pub mod assembler;

pub use assembler::{format_tokens_pretty, FfmpegCommandBuilder};
