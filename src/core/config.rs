use std::env;

use serde::{Deserialize, Serialize};

use crate::core::errors::ConfigError;
use crate::core::types::Region;

/// What part of the screen gets captured each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    FullScreen,
    Region,
    Window,
}

impl CaptureMode {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "fullscreen" | "full_screen" => Ok(Self::FullScreen),
            "region" => Ok(Self::Region),
            "window" => Ok(Self::Window),
            other => Err(ConfigError::UnknownCaptureMode(other.to_string())),
        }
    }
}

/// Immutable configuration snapshot read by the worker each cycle.
///
/// Swapped wholesale between cycles via `Pipeline::update_settings`; never
/// mutated mid-cycle. Language codes are FLORES-200 (`"auto"` is allowed for
/// the source and resolves per `languages::effective_source`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub capture_mode: CaptureMode,
    pub capture_region: Option<Region>,
    pub capture_window_title: Option<String>,
    pub capture_monitor: usize,
    pub source_language: String,
    pub target_language: String,
    pub update_interval_ms: u64,
    pub frame_diff_threshold: f64,
    pub ocr_confidence_threshold: f32,
    pub max_cache_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            capture_mode: CaptureMode::FullScreen,
            capture_region: None,
            capture_window_title: None,
            capture_monitor: 0,
            source_language: "auto".to_string(),
            target_language: "fra_Latn".to_string(),
            update_interval_ms: 1000,
            frame_diff_threshold: 5.0,
            ocr_confidence_threshold: 0.3,
            max_cache_size: 500,
        }
    }
}

impl PipelineSettings {
    /// Load settings from `SCREENLATE_*` environment variables, falling back
    /// to defaults for anything unset. Reads `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let capture_mode = match env::var("SCREENLATE_CAPTURE_MODE") {
            Ok(s) => CaptureMode::parse(&s)?,
            Err(_) => defaults.capture_mode,
        };

        let capture_region = match env::var("SCREENLATE_CAPTURE_REGION") {
            Ok(s) => Some(parse_region(&s)?),
            Err(_) => None,
        };

        let settings = Self {
            capture_mode,
            capture_region,
            capture_window_title: env::var("SCREENLATE_CAPTURE_WINDOW").ok(),
            capture_monitor: env::var("SCREENLATE_CAPTURE_MONITOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.capture_monitor),
            source_language: env::var("SCREENLATE_SOURCE_LANG")
                .unwrap_or(defaults.source_language),
            target_language: env::var("SCREENLATE_TARGET_LANG")
                .unwrap_or(defaults.target_language),
            update_interval_ms: env::var("SCREENLATE_UPDATE_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.update_interval_ms),
            frame_diff_threshold: env::var("SCREENLATE_FRAME_DIFF_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_diff_threshold),
            ocr_confidence_threshold: env::var("SCREENLATE_OCR_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ocr_confidence_threshold),
            max_cache_size: env::var("SCREENLATE_MAX_CACHE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_cache_size),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval_ms < 100 {
            return Err(ConfigError::InvalidInterval(self.update_interval_ms));
        }

        if !(0.0..=255.0).contains(&self.frame_diff_threshold) {
            return Err(ConfigError::InvalidDiffThreshold(self.frame_diff_threshold));
        }

        if !(0.0..=1.0).contains(&self.ocr_confidence_threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                self.ocr_confidence_threshold,
            ));
        }

        if self.max_cache_size == 0 {
            return Err(ConfigError::InvalidCacheSize);
        }

        if self.capture_mode == CaptureMode::Region {
            match self.capture_region {
                Some(r) if r.width > 0 && r.height > 0 => {}
                _ => return Err(ConfigError::InvalidRegion),
            }
        }

        Ok(())
    }
}

/// Parse a `"x,y,width,height"` region string.
fn parse_region(s: &str) -> Result<Region, ConfigError> {
    let parts: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|e| ConfigError::EnvVarError(format!("bad region '{s}': {e}")))?;

    if parts.len() != 4 {
        return Err(ConfigError::EnvVarError(format!(
            "region must be 'x,y,width,height', got '{s}'"
        )));
    }

    Ok(Region::new(parts[0], parts[1], parts[2], parts[3]))
}
