// Foreground/background color extraction for text regions.

use image::RgbImage;
use tracing::debug;

use crate::core::types::{Rgb, TextBlock};

/// Derives text and page colors for each block from the surrounding pixels.
///
/// Background comes from the per-channel median of border strips just outside
/// the block (borders usually show page background rather than glyph ink, and
/// a median resists thin strokes crossing them). Foreground is the 2-means
/// cluster center of the inner pixels that sits farthest from that
/// background, so k-means only has to find the contrasting cluster, not
/// decide which cluster is semantically which.
#[derive(Debug, Default)]
pub struct StyleSampler;

impl StyleSampler {
    pub fn new() -> Self {
        Self
    }

    /// Populate `fg_color`/`bg_color` on each block. Block coordinates must
    /// be relative to `frame`. A block that cannot be sampled keeps unset
    /// colors; one bad block never affects the others.
    pub fn extract(&self, frame: &RgbImage, blocks: &mut [TextBlock]) {
        for block in blocks.iter_mut() {
            match sample_block(frame, block) {
                Some((bg, fg)) => {
                    block.bg_color = Some(bg);
                    block.fg_color = Some(fg);
                }
                None => {
                    let preview: String = block.text.chars().take(20).collect();
                    debug!("style sampling skipped for block '{preview}'");
                }
            }
        }
    }
}

/// Returns `(background, foreground)` for one block, or None when the block
/// is degenerate (off-frame, or fewer than 2 inner pixels).
fn sample_block(frame: &RgbImage, block: &TextBlock) -> Option<(Rgb, Rgb)> {
    let fw = frame.width() as i32;
    let fh = frame.height() as i32;

    let margin = (block.height / 2).max(4);

    // Expanded sampling ROI, clamped to the frame
    let x1 = (block.x - margin).max(0);
    let y1 = (block.y - margin).max(0);
    let x2 = (block.x + block.width + margin).min(fw);
    let y2 = (block.y + block.height + margin).min(fh);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let roi_w = x2 - x1;
    let roi_h = y2 - y1;
    let strip = (margin / 2).max(2);

    // Border strips: top/bottom across the full ROI width, left/right down
    // the full ROI height. Corners land in two strips, same as sampling the
    // strips independently.
    let mut border: Vec<[f64; 3]> = Vec::new();
    if strip < roi_h {
        collect_pixels(frame, x1, y1, x2, y1 + strip, &mut border);
        collect_pixels(frame, x1, y2 - strip, x2, y2, &mut border);
    }
    if strip < roi_w {
        collect_pixels(frame, x1, y1, x1 + strip, y2, &mut border);
        collect_pixels(frame, x2 - strip, y1, x2, y2, &mut border);
    }

    let bg = if border.is_empty() {
        [255.0, 255.0, 255.0]
    } else {
        channel_median(&mut border)
    };

    // Inner ROI: the original bbox clipped into the expanded ROI
    let ix1 = block.x.max(x1);
    let iy1 = block.y.max(y1);
    let ix2 = (block.x + block.width).min(x2);
    let iy2 = (block.y + block.height).min(y2);

    let mut inner: Vec<[f64; 3]> = Vec::new();
    if ix2 > ix1 && iy2 > iy1 {
        collect_pixels(frame, ix1, iy1, ix2, iy2, &mut inner);
    }
    if inner.len() < 2 {
        return None;
    }

    let (c0, c1) = kmeans2(&inner);

    let fg = if sq_dist(c0, bg) > sq_dist(c1, bg) { c0 } else { c1 };

    Some((to_rgb(bg), to_rgb(fg)))
}

/// Append the pixels of a half-open rect (already within frame bounds).
fn collect_pixels(frame: &RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, out: &mut Vec<[f64; 3]>) {
    for y in y1..y2 {
        for x in x1..x2 {
            let p = frame.get_pixel(x as u32, y as u32);
            out.push([f64::from(p[0]), f64::from(p[1]), f64::from(p[2])]);
        }
    }
}

/// Per-channel median. Sorts each channel independently in place.
fn channel_median(pixels: &mut [[f64; 3]]) -> [f64; 3] {
    let mut result = [0.0; 3];
    let mut channel: Vec<f64> = Vec::with_capacity(pixels.len());
    for c in 0..3 {
        channel.clear();
        channel.extend(pixels.iter().map(|p| p[c]));
        channel.sort_by(|a, b| a.total_cmp(b));
        let n = channel.len();
        result[c] = if n % 2 == 1 {
            channel[n / 2]
        } else {
            (channel[n / 2 - 1] + channel[n / 2]) / 2.0
        };
    }
    result
}

/// 2-means over color space with deterministic seeding (darkest and
/// brightest pixels). Convergence precision is not critical for a two-point
/// split, only separation, so a handful of iterations is enough.
fn kmeans2(pixels: &[[f64; 3]]) -> ([f64; 3], [f64; 3]) {
    let luma = |p: &[f64; 3]| 0.299 * p[0] + 0.587 * p[1] + 0.114 * p[2];

    let mut c0 = pixels[0];
    let mut c1 = pixels[0];
    for p in pixels {
        if luma(p) < luma(&c0) {
            c0 = *p;
        }
        if luma(p) > luma(&c1) {
            c1 = *p;
        }
    }

    for _ in 0..10 {
        let mut sum0 = [0.0; 3];
        let mut sum1 = [0.0; 3];
        let mut n0 = 0usize;
        let mut n1 = 0usize;

        for p in pixels {
            if sq_dist(*p, c0) <= sq_dist(*p, c1) {
                for c in 0..3 {
                    sum0[c] += p[c];
                }
                n0 += 1;
            } else {
                for c in 0..3 {
                    sum1[c] += p[c];
                }
                n1 += 1;
            }
        }

        let next0 = if n0 > 0 { sum0.map(|s| s / n0 as f64) } else { c0 };
        let next1 = if n1 > 0 { sum1.map(|s| s / n1 as f64) } else { c1 };

        if next0 == c0 && next1 == c1 {
            break;
        }
        c0 = next0;
        c1 = next1;
    }

    (c0, c1)
}

fn sq_dist(a: [f64; 3], b: [f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

fn to_rgb(c: [f64; 3]) -> Rgb {
    Rgb(
        c[0].round().clamp(0.0, 255.0) as u8,
        c[1].round().clamp(0.0, 255.0) as u8,
        c[2].round().clamp(0.0, 255.0) as u8,
    )
}
