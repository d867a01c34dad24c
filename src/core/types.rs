// Data model for the translation pipeline

use serde::{Deserialize, Serialize};

/// An RGB color triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// A rectangle in absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// A detected (or merged) region of on-screen text.
///
/// Geometry is in the coordinate space of the frame the block was detected
/// from, adjusted by the capture-region offset before publication. Blocks are
/// value objects: merging and offsetting produce new blocks rather than
/// mutating inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Recognized source-language text. Immutable after detection.
    pub text: String,
    /// Set only after a cache hit or a successful translation call.
    pub translation: Option<String>,
    /// Recognition confidence in [0, 1]. Informational, not gating.
    pub confidence: f32,
    /// Suggested rendering size in pixels, derived from bbox height.
    pub font_size: u32,
    pub fg_color: Option<Rgb>,
    pub bg_color: Option<Rgb>,
}

impl TextBlock {
    /// Create a block, deriving `font_size` from the bbox height.
    pub fn new(x: i32, y: i32, width: i32, height: i32, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            text: text.into(),
            translation: None,
            confidence,
            font_size: font_size_for_height(height),
            fg_color: None,
            bg_color: None,
        }
    }

    /// A copy of this block translated by `(dx, dy)`.
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self.clone()
        }
    }
}

/// Suggested font size for a line of the given pixel height.
pub fn font_size_for_height(height: i32) -> u32 {
    ((height as f64 * 0.75).round() as i64).max(8) as u32
}

/// Session lifecycle state, owned exclusively by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    /// Transient state while `shutdown()` drains the worker.
    Stopping,
}

/// Messages published from the pipeline worker to the rendering consumer.
///
/// All variants travel on one FIFO channel so that an empty-block publication
/// is always observed before the real-block publication from the same cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A new (possibly empty) set of blocks to overlay.
    Blocks(Vec<TextBlock>),
    /// A stage failure surfaced to the consumer. The cycle was a no-op.
    Error(String),
    /// Human-readable session status changes.
    Status(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_size_derivation() {
        assert_eq!(font_size_for_height(20), 15);
        assert_eq!(font_size_for_height(40), 30);
        // Floor of 8 px for tiny lines
        assert_eq!(font_size_for_height(4), 8);
        assert_eq!(font_size_for_height(10), 8);
        // 0.75 * 11 = 8.25 -> rounds to 8
        assert_eq!(font_size_for_height(11), 8);
        assert_eq!(font_size_for_height(12), 9);
    }

    #[test]
    fn test_block_offset_is_a_copy() {
        let block = TextBlock::new(10, 20, 100, 16, "hello world", 0.9);
        let moved = block.offset(-10, -20);
        assert_eq!((moved.x, moved.y), (0, 0));
        assert_eq!((moved.width, moved.height), (100, 16));
        assert_eq!(moved.text, "hello world");
        // Original untouched
        assert_eq!((block.x, block.y), (10, 20));
    }

    #[test]
    fn test_new_block_has_no_colors_or_translation() {
        let block = TextBlock::new(0, 0, 50, 12, "sample text", 1.0);
        assert!(block.translation.is_none());
        assert!(block.fg_color.is_none());
        assert!(block.bg_color.is_none());
        assert_eq!(block.font_size, 9);
    }
}
