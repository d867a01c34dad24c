use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use tracing::debug;

/// Default comparison threshold on the 0-255 intensity scale.
pub const DEFAULT_DIFF_THRESHOLD: f64 = 5.0;

/// Frames wider than this are downsampled before comparison so the cost is
/// bounded regardless of source resolution.
pub const DEFAULT_DOWNSAMPLE_WIDTH: u32 = 320;

/// Decides whether a new frame differs enough from the previous one to
/// justify re-running OCR and translation.
///
/// Works on a grayscale, width-bounded downsample of the frame and compares
/// mean absolute pixel-intensity difference against `threshold`. The stored
/// reference slides: the current frame always becomes the new reference,
/// whatever the outcome.
pub struct ChangeDetector {
    pub threshold: f64,
    downsample_width: u32,
    prev: Option<GrayImage>,
}

impl ChangeDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            downsample_width: DEFAULT_DOWNSAMPLE_WIDTH,
            prev: None,
        }
    }

    pub fn with_downsample_width(threshold: f64, downsample_width: u32) -> Self {
        Self {
            threshold,
            downsample_width: downsample_width.max(1),
            prev: None,
        }
    }

    /// Returns true if the frame changed, is the first frame seen, or has a
    /// different downsampled shape than the stored reference (resolution or
    /// monitor change) — mismatched shapes are never compared.
    pub fn has_changed(&mut self, frame: &RgbImage) -> bool {
        let mut gray = imageops::grayscale(frame);

        let (w, h) = gray.dimensions();
        if w > self.downsample_width {
            let scale = self.downsample_width as f64 / w as f64;
            let new_h = ((h as f64 * scale) as u32).max(1);
            gray = imageops::resize(&gray, self.downsample_width, new_h, FilterType::Triangle);
        }

        let changed = match &self.prev {
            None => true,
            Some(prev) if prev.dimensions() != gray.dimensions() => true,
            Some(prev) => {
                let total: f64 = prev
                    .as_raw()
                    .iter()
                    .zip(gray.as_raw())
                    .map(|(a, b)| (f64::from(*a) - f64::from(*b)).abs())
                    .sum();
                let diff = total / gray.as_raw().len().max(1) as f64;
                let changed = diff > self.threshold;
                if !changed {
                    debug!("frame unchanged (diff={:.2}, threshold={:.2})", diff, self.threshold);
                }
                changed
            }
        };

        self.prev = Some(gray);
        changed
    }

    /// Clear the stored reference, forcing the next call to report "changed".
    pub fn reset(&mut self) {
        self.prev = None;
    }
}
