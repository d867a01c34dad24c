// Custom error types for better error handling and debugging
//
// Using thiserror for ergonomic error definitions with:
// - Type-safe error matching
// - Automatic Display/Error trait implementations
// - Source error chaining

use thiserror::Error;

/// Settings validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("update interval must be >= 100 ms, got {0}")]
    InvalidInterval(u64),

    #[error("frame diff threshold must be in [0.0, 255.0], got {0}")]
    InvalidDiffThreshold(f64),

    #[error("OCR confidence threshold must be in [0.0, 1.0], got {0}")]
    InvalidConfidenceThreshold(f32),

    #[error("cache size must be > 0")]
    InvalidCacheSize,

    #[error("region capture mode requires a capture region with positive dimensions")]
    InvalidRegion,

    #[error("unknown capture mode: {0}")]
    UnknownCaptureMode(String),

    #[error("environment variable parsing failed: {0}")]
    EnvVarError(String),
}

/// Orchestrator lifecycle errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline engines are owned by the running worker")]
    WorkerActive,

    #[error("OCR initialization failed: {0}")]
    OcrInit(#[source] anyhow::Error),

    #[error("translation model load failed: {0}")]
    ModelLoad(#[source] anyhow::Error),

    #[error("invalid settings: {0}")]
    Config(#[from] ConfigError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
