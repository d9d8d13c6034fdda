//! Settings model and persistence.

pub mod manager;
pub mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{EncodingSettings, EngineSettings, PathSettings, Settings};
