//! # Render Module
//!
//! Turns comparison output into something an operator can look at: the
//! frame with the region outlined in the decision colour, and terminal
//! summaries of the score and the SSIM diff map.

mod visualization;

pub use visualization::DiffVisualizer;

use crate::core::decision::Emphasis;
use crate::core::frame::Frame;
use crate::core::region::PixelRect;
use image::{Rgb, RgbImage};

/// Outline thickness in pixels
pub const OUTLINE_THICKNESS: u32 = 2;

/// Copy of `frame` with `rect` outlined.
///
/// The outline is drawn inside the rectangle so it never leaves the frame.
/// `None` draws it in neutral white (no comparison yet).
pub fn annotate(frame: &Frame, rect: PixelRect, emphasis: Option<Emphasis>) -> RgbImage {
    let mut canvas = frame.pixels().clone();
    let color = emphasis.map_or(Rgb([255, 255, 255]), |e| e.color());
    draw_outline(&mut canvas, rect, color, OUTLINE_THICKNESS);
    canvas
}

/// Draw a rectangle outline of the given thickness, clipped to the image
pub fn draw_outline(canvas: &mut RgbImage, rect: PixelRect, color: Rgb<u8>, thickness: u32) {
    let Some(rect) = rect.clamp_to(canvas.width(), canvas.height()) else {
        return;
    };
    let t = thickness.min(rect.width).min(rect.height);

    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let on_edge = x < rect.x + t
                || x >= rect.right() - t
                || y < rect.y + t
                || y >= rect.bottom() - t;
            if on_edge {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}
