// OCR collaborator contract and line-level output shaping.

use anyhow::Result;
use image::RgbImage;

use crate::core::types::TextBlock;

/// Minimum trimmed text length worth translating.
pub const MIN_TEXT_LENGTH: usize = 5;

/// Detections with a bbox side under this are discarded as noise.
const MIN_BOX_PX: i32 = 5;

/// Text-recognition backend. Implementations wrap a platform OCR engine;
/// `detect` returns raw line-level blocks in absolute screen coordinates
/// (offsets already applied). Filtering and paragraph merging happen in the
/// pipeline via [`filter_lines`] and the merge service.
pub trait OcrBackend: Send {
    /// One-time engine setup for a BCP-47 language tag. Fatal on failure;
    /// the session never starts.
    fn initialize(&mut self, bcp47: &str) -> Result<()>;

    /// Switch recognition language. Takes a FLORES-200 code; unmapped codes
    /// are the backend's problem to fall back from.
    fn set_language(&mut self, flores_code: &str);

    /// Update the minimum recognition confidence without reinitializing.
    fn set_confidence_floor(&mut self, threshold: f32);

    /// Recognize text in a frame. `offset_x`/`offset_y` are added to every
    /// bbox so results come back in absolute screen coordinates.
    fn detect(&mut self, frame: &RgbImage, offset_x: i32, offset_y: i32) -> Result<Vec<TextBlock>>;
}

/// Drop line detections that are not worth translating: trimmed text shorter
/// than [`MIN_TEXT_LENGTH`], digits/punctuation-only text, or a bbox under
/// 5x5 px. Surviving blocks carry the trimmed text.
pub fn filter_lines(blocks: Vec<TextBlock>) -> Vec<TextBlock> {
    blocks
        .into_iter()
        .filter_map(|mut block| {
            let trimmed = block.text.trim();
            if trimmed.chars().count() < MIN_TEXT_LENGTH || is_noise(trimmed) {
                return None;
            }
            if block.width < MIN_BOX_PX || block.height < MIN_BOX_PX {
                return None;
            }
            if trimmed.len() != block.text.len() {
                block.text = trimmed.to_string();
            }
            Some(block)
        })
        .collect()
}

/// True when the text is only digits, whitespace and separator punctuation —
/// page furniture like "12:34" or "-----" that translation can't improve.
fn is_noise(text: &str) -> bool {
    text.chars().all(|c| {
        c.is_ascii_digit() || c.is_whitespace() || ".,;:!?-—–|@#$%^&*()[]{}/\\".contains(c)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str, w: i32, h: i32) -> TextBlock {
        TextBlock::new(0, 0, w, h, text, 1.0)
    }

    #[test]
    fn test_short_text_dropped() {
        let out = filter_lines(vec![block("hi", 50, 20), block("hello there", 50, 20)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "hello there");
    }

    #[test]
    fn test_punctuation_and_digits_dropped() {
        let out = filter_lines(vec![
            block("12:34:56", 50, 20),
            block("-----|-----", 50, 20),
            block("(!!...??)", 50, 20),
            block("real words here", 50, 20),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "real words here");
    }

    #[test]
    fn test_tiny_boxes_dropped() {
        let out = filter_lines(vec![
            block("wide enough", 50, 3),
            block("tall enough", 3, 50),
            block("both fine!", 50, 50),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "both fine!");
    }

    #[test]
    fn test_text_is_trimmed() {
        let out = filter_lines(vec![block("  padded text  ", 50, 20)]);
        assert_eq!(out[0].text, "padded text");
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // Five CJK chars are >= MIN_TEXT_LENGTH even though each is 3 bytes
        let out = filter_lines(vec![block("こんにちは", 50, 20)]);
        assert_eq!(out.len(), 1);
    }
}
