// screenlate: real-time screen translation pipeline.
//
// Captures the screen on an interval, skips unchanged frames, recognizes
// text, merges lines into paragraphs, samples text/background colors,
// translates through an LRU-cached batch call and publishes overlay-ready
// blocks on an event channel.

pub mod core;
pub mod orchestration;
pub mod services;
pub mod utils;

// Re-export the surface most callers need
pub use crate::core::config::{CaptureMode, PipelineSettings};
pub use crate::core::errors::{ConfigError, PipelineError};
pub use crate::core::types::{PipelineEvent, Region, Rgb, SessionState, TextBlock};
pub use crate::orchestration::Pipeline;
pub use crate::services::capture::{with_fallback, CaptureBackend, CaptureFactory};
pub use crate::services::ocr::OcrBackend;
pub use crate::services::translation::{TranslationBackend, TranslationCache};
pub use crate::utils::stats::StatsSnapshot;
