pub mod config;
pub mod errors;
pub mod languages;
pub mod types;

// Re-export commonly used items for convenience
pub use config::{CaptureMode, PipelineSettings};
pub use errors::{ConfigError, PipelineError};
pub use types::{PipelineEvent, Region, Rgb, SessionState, TextBlock};
