//! # Region Module
//!
//! Region-of-interest geometry and extraction.
//!
//! Regions are stored as fractions of the frame so they survive resolution
//! changes. They are converted to pixels only when a frame is at hand.
//!
//! ## Example
//! ```rust,ignore
//! use roi_match::core::region::{extract, Region};
//!
//! let region = Region::new(0.2, 0.2, 0.8, 0.8)?;
//! let roi = extract(&frame, &region)?;
//! ```

mod extract;

pub use extract::{extract, extract_pixels};

use crate::error::RegionError;
use serde::{Deserialize, Serialize};

/// A rectangle in pixel units, end-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive)
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive)
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Clip to a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` when nothing of the rectangle remains.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<PixelRect> {
        let x0 = self.x.min(frame_width);
        let y0 = self.y.min(frame_height);
        let x1 = self.right().min(frame_width);
        let y1 = self.bottom().min(frame_height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(PixelRect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{})-({},{}) {}x{}",
            self.x,
            self.y,
            self.right(),
            self.bottom(),
            self.width,
            self.height
        )
    }
}

/// Region of interest as fractions of the frame size.
///
/// Invariants: every edge is finite and in `[0, 1]`, `left < right` and
/// `top < bottom`. The fields are private so the invariants hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RegionBounds", into = "RegionBounds")]
pub struct Region {
    top: f64,
    left: f64,
    bottom: f64,
    right: f64,
}

/// Unvalidated region edges, as read from config or typed by the operator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl Region {
    /// Region used when no configuration exists
    pub const DEFAULT: Region = Region {
        top: 0.2,
        left: 0.2,
        bottom: 0.8,
        right: 0.8,
    };

    /// Create a validated region
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Result<Self, RegionError> {
        let edges = [("top", top), ("left", left), ("bottom", bottom), ("right", right)];
        for (name, value) in edges {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(RegionError::invalid(format!(
                    "{} edge {} must be between 0.0 and 1.0",
                    name, value
                )));
            }
        }

        if left >= right {
            return Err(RegionError::invalid(format!(
                "left ({}) must be less than right ({})",
                left, right
            )));
        }

        if top >= bottom {
            return Err(RegionError::invalid(format!(
                "top ({}) must be less than bottom ({})",
                top, bottom
            )));
        }

        Ok(Self {
            top,
            left,
            bottom,
            right,
        })
    }

    /// Convert an operator-drawn pixel rectangle into fractional geometry
    pub fn from_pixel_rect(
        rect: PixelRect,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self, RegionError> {
        if frame_width == 0 || frame_height == 0 {
            return Err(RegionError::EmptyFrame {
                width: frame_width,
                height: frame_height,
            });
        }

        let clipped = rect
            .clamp_to(frame_width, frame_height)
            .ok_or(RegionError::EmptyCrop {
                frame_width,
                frame_height,
            })?;

        let w = frame_width as f64;
        let h = frame_height as f64;
        Region::new(
            clipped.y as f64 / h,
            clipped.x as f64 / w,
            clipped.bottom() as f64 / h,
            clipped.right() as f64 / w,
        )
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    /// Pixel rectangle for a frame of the given size, clipped to the frame.
    ///
    /// Edges are rounded to the nearest pixel.
    pub fn to_pixel_rect(
        &self,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<PixelRect, RegionError> {
        if frame_width == 0 || frame_height == 0 {
            return Err(RegionError::EmptyFrame {
                width: frame_width,
                height: frame_height,
            });
        }

        let to_px = |fraction: f64, extent: u32| (fraction * extent as f64).round() as u32;

        let x0 = to_px(self.left, frame_width);
        let x1 = to_px(self.right, frame_width);
        let y0 = to_px(self.top, frame_height);
        let y1 = to_px(self.bottom, frame_height);

        PixelRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
            .clamp_to(frame_width, frame_height)
            .ok_or(RegionError::EmptyCrop {
                frame_width,
                frame_height,
            })
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<RegionBounds> for Region {
    type Error = RegionError;

    fn try_from(bounds: RegionBounds) -> Result<Self, Self::Error> {
        Region::new(bounds.top, bounds.left, bounds.bottom, bounds.right)
    }
}

impl From<Region> for RegionBounds {
    fn from(region: Region) -> Self {
        RegionBounds {
            top: region.top,
            left: region.left,
            bottom: region.bottom,
            right: region.right,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "top={:.3} left={:.3} bottom={:.3} right={:.3}",
            self.top, self.left, self.bottom, self.right
        )
    }
}
