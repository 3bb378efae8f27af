//! # Frame Module
//!
//! The immutable RGB frames produced by a frame source once per tick.

use chrono::{DateTime, Utc};
use image::{DynamicImage, RgbImage};
use std::sync::Arc;

/// A single acquired camera frame.
///
/// Cloning is cheap: the pixel buffer is shared, never mutated.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Arc<RgbImage>,
    sequence: u64,
    acquired_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap an RGB buffer as a frame with sequence number 0
    pub fn new(pixels: RgbImage) -> Self {
        Self::with_sequence(pixels, 0)
    }

    /// Wrap an RGB buffer with an explicit sequence number
    pub fn with_sequence(pixels: RgbImage, sequence: u64) -> Self {
        Self {
            pixels: Arc::new(pixels),
            sequence,
            acquired_at: Utc::now(),
        }
    }

    /// Convert any decoded image into an RGB frame
    pub fn from_dynamic(image: DynamicImage, sequence: u64) -> Self {
        Self::with_sequence(image.to_rgb8(), sequence)
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Monotonic per-source counter
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// True when the frame has at least one pixel
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}
