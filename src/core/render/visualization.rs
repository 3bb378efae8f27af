//! Terminal rendering of SSIM results.
//!
//! Provides textual views of a comparison so the operator can see where the
//! live region drifted from the reference.

use crate::core::similarity::SimilarityResult;
use image::GrayImage;

/// Shades from "differs" to "matches"
const SHADES: [char; 5] = ['X', 'x', '+', '-', '.'];

/// Renders diff maps and scores as text
pub struct DiffVisualizer {
    /// Maximum number of character columns in a heat map
    columns: u32,
}

impl DiffVisualizer {
    pub fn new(columns: u32) -> Self {
        Self {
            columns: columns.max(1),
        }
    }

    /// Coarse ASCII heat map of a diff map.
    ///
    /// Each character summarises a block of pixels by its mean local SSIM:
    /// - `.` = block matches
    /// - `X` = block differs
    ///
    /// Character rows cover twice as many pixels as columns to
    /// compensate for terminal cell aspect.
    pub fn heat_map(&self, diff_map: &GrayImage) -> String {
        let (width, height) = diff_map.dimensions();
        if width == 0 || height == 0 {
            return String::new();
        }

        let cols = self.columns.min(width);
        let block_w = width.div_ceil(cols);
        let block_h = (block_w * 2).min(height);
        let rows = height.div_ceil(block_h);

        let mut output = String::new();
        output.push_str("Diff map (. = same, X = different):\n\n");

        for row in 0..rows {
            output.push_str("  ");
            for col in 0..width.div_ceil(block_w) {
                let x0 = col * block_w;
                let y0 = row * block_h;
                let x1 = (x0 + block_w).min(width);
                let y1 = (y0 + block_h).min(height);

                let mut sum = 0u64;
                for y in y0..y1 {
                    for x in x0..x1 {
                        sum += diff_map.get_pixel(x, y)[0] as u64;
                    }
                }
                let count = ((x1 - x0) * (y1 - y0)) as u64;
                output.push(shade(sum as f64 / count as f64 / 255.0));
            }
            output.push('\n');
        }

        output
    }

    /// One-line summary of a comparison
    pub fn summarize(&self, result: &SimilarityResult, threshold: f64) -> String {
        let (width, height) = result.dimensions();
        format!(
            "SSIM {:.4} over {}x{} (threshold {:.2})",
            result.score(),
            width,
            height,
            threshold
        )
    }

    /// Generate a compact similarity indicator
    ///
    /// Returns a visual bar showing similarity:
    /// `[████████░░] 80%`
    pub fn similarity_bar(&self, similarity_percent: f64) -> String {
        let percent = if similarity_percent.is_nan() {
            0.0
        } else {
            similarity_percent.clamp(0.0, 100.0)
        };
        let filled = (percent / 10.0).round() as usize;
        let empty = 10 - filled;

        format!(
            "[{}{}] {:.0}%",
            "█".repeat(filled),
            "░".repeat(empty),
            percent
        )
    }
}

impl Default for DiffVisualizer {
    fn default() -> Self {
        Self::new(32)
    }
}

fn shade(similarity: f64) -> char {
    let index = (similarity * (SHADES.len() - 1) as f64).round() as usize;
    SHADES[index.min(SHADES.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::similarity::compare;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn matching_map_is_all_dots() {
        let visualizer = DiffVisualizer::new(8);
        let map = GrayImage::from_pixel(64, 32, Luma([255]));

        let output = visualizer.heat_map(&map);
        let body: String = output.lines().skip(2).collect();

        assert!(body.contains('.'));
        assert!(!body.contains('X'));
        assert_eq!(output.lines().nth(2).unwrap().trim().len(), 8);
    }

    #[test]
    fn differing_half_shows_crosses() {
        let visualizer = DiffVisualizer::new(4);
        let map = GrayImage::from_fn(64, 16, |x, _| if x < 32 { Luma([255]) } else { Luma([0]) });

        let row = visualizer.heat_map(&map).lines().nth(2).unwrap().trim().to_string();

        assert_eq!(row, "..XX");
    }

    #[test]
    fn small_map_uses_fewer_columns() {
        let visualizer = DiffVisualizer::new(32);
        let map = GrayImage::from_pixel(3, 3, Luma([128]));

        let output = visualizer.heat_map(&map);
        assert_eq!(output.lines().nth(2).unwrap().trim().chars().count(), 3);
    }

    #[test]
    fn empty_map_renders_nothing() {
        assert!(DiffVisualizer::default().heat_map(&GrayImage::new(0, 0)).is_empty());
    }

    #[test]
    fn summary_mentions_score_and_size() {
        let image = RgbImage::from_fn(20, 10, |x, _| Rgb([(x * 10) as u8, 0, 0]));
        let result = compare(&image, &image).unwrap();

        let summary = DiffVisualizer::default().summarize(&result, 0.85);

        assert!(summary.contains("1.0000"));
        assert!(summary.contains("20x10"));
        assert!(summary.contains("0.85"));
    }

    #[test]
    fn similarity_bar_full() {
        let bar = DiffVisualizer::default().similarity_bar(100.0);
        assert!(bar.contains("██████████"));
        assert!(bar.contains("100%"));
    }

    #[test]
    fn similarity_bar_partial() {
        let bar = DiffVisualizer::default().similarity_bar(50.0);
        assert!(bar.contains("█████"));
        assert!(bar.contains("░░░░░"));
        assert!(bar.contains("50%"));
    }

    #[test]
    fn similarity_bar_clamps_out_of_range() {
        let bar = DiffVisualizer::default().similarity_bar(140.0);
        assert!(bar.contains("100%"));
        assert!(DiffVisualizer::default().similarity_bar(f64::NAN).contains("0%"));
    }
}
