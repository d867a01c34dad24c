// Paragraph reconstruction from line-level OCR output.

use crate::core::types::TextBlock;

/// Merge vertically adjacent line detections that form a paragraph.
///
/// Lines merge when the vertical gap to the next line is under 1.5x the
/// current line height and their left edges align within 30% of the current
/// width (left-aligned / justified paragraph heuristic). A merge produces a
/// new block spanning both bboxes with the texts joined by a space and the
/// font size inherited from the earlier line; inputs are never mutated.
///
/// Blocks are processed in ascending `y` order; the sort is stable, so ties
/// keep their input order (an implementation property, not a contract).
pub fn merge_paragraph_lines(mut blocks: Vec<TextBlock>) -> Vec<TextBlock> {
    if blocks.len() <= 1 {
        return blocks;
    }

    blocks.sort_by_key(|b| b.y);

    let mut iter = blocks.into_iter();
    let mut current = match iter.next() {
        Some(first) => first,
        None => return Vec::new(),
    };

    let mut merged = Vec::new();

    for next in iter {
        let gap = next.y - (current.y + current.height);
        let x_diff = (next.x - current.x).abs();

        let same_paragraph = (gap as f64) < current.height as f64 * 1.5
            && (x_diff as f64) < current.width as f64 * 0.3;

        if same_paragraph {
            current = merge_pair(&current, &next);
        } else {
            merged.push(current);
            current = next;
        }
    }

    merged.push(current);
    merged
}

/// A new block covering the union of both bboxes, with joined text.
fn merge_pair(current: &TextBlock, next: &TextBlock) -> TextBlock {
    let x = current.x.min(next.x);
    let y = current.y;
    let x2 = (current.x + current.width).max(next.x + next.width);
    let y2 = next.y + next.height;

    TextBlock {
        x,
        y,
        width: x2 - x,
        height: y2 - y,
        text: format!("{} {}", current.text, next.text),
        translation: None,
        confidence: 1.0,
        // Earlier (typically first) line sets the paragraph's size
        font_size: current.font_size,
        fg_color: None,
        bg_color: None,
    }
}
