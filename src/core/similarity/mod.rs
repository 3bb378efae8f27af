//! # Similarity Module
//!
//! Structural similarity (SSIM) between a reference region and a live region.
//!
//! ## How It Works
//! 1. Convert both images to 8-bit luminance (BT.601 weights)
//! 2. Compute local means, variances and covariance over a sliding window
//! 3. Combine them with the SSIM formula into a per-pixel map
//! 4. Average the map into a single score (1.0 = identical)
//!
//! The per-pixel map is also rendered as a grayscale diff image where
//! brighter means more similar.
//!
//! ## Example
//! ```rust,ignore
//! use roi_match::core::similarity::SsimConfig;
//!
//! let engine = SsimConfig::new().window_size(7).build()?;
//! let result = engine.compare(&reference, &live)?;
//! println!("SSIM {:.4}", result.score());
//! ```

mod ssim;

use crate::error::CompareError;
use image::{GrayImage, Luma, RgbImage};
use ssim::{ssim_map, SsimParams};

/// Outcome of a single comparison. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    score: f64,
    diff_map: GrayImage,
}

impl SimilarityResult {
    /// Mean SSIM in `[0, 1]`
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Per-pixel similarity, 255 = identical neighbourhood
    pub fn diff_map(&self) -> &GrayImage {
        &self.diff_map
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.diff_map.dimensions()
    }

    /// Score as a percentage (0-100)
    pub fn percent(&self) -> f64 {
        self.score * 100.0
    }
}

/// Configuration builder for the similarity engine
#[derive(Debug, Clone)]
pub struct SsimConfig {
    /// Side of the square sliding window (odd)
    window_size: u32,
    /// Luminance stabilisation constant
    k1: f64,
    /// Contrast stabilisation constant
    k2: f64,
}

impl SsimConfig {
    /// Standard SSIM parameters: 7x7 window, K1 = 0.01, K2 = 0.03
    pub fn new() -> Self {
        Self {
            window_size: 7,
            k1: 0.01,
            k2: 0.03,
        }
    }

    /// Set the window side. Must be odd.
    ///
    /// Larger windows smooth over small movements; regions smaller than the
    /// window use the largest odd window that fits.
    pub fn window_size(mut self, size: u32) -> Self {
        self.window_size = size;
        self
    }

    pub fn k1(mut self, k1: f64) -> Self {
        self.k1 = k1;
        self
    }

    pub fn k2(mut self, k2: f64) -> Self {
        self.k2 = k2;
        self
    }

    /// Validate and build the engine
    pub fn build(self) -> Result<SimilarityEngine, CompareError> {
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(CompareError::InvalidConfig(format!(
                "window size must be a positive odd number, got {}",
                self.window_size
            )));
        }

        for (name, value) in [("K1", self.k1), ("K2", self.k2)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CompareError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        Ok(SimilarityEngine {
            params: SsimParams {
                window_size: self.window_size,
                k1: self.k1,
                k2: self.k2,
            },
        })
    }
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes SSIM scores and diff maps
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    params: SsimParams,
}

impl SimilarityEngine {
    /// Window side requested by the configuration
    pub fn window_size(&self) -> u32 {
        self.params.window_size
    }

    /// Compare two RGB images of identical size
    pub fn compare(
        &self,
        reference: &RgbImage,
        candidate: &RgbImage,
    ) -> Result<SimilarityResult, CompareError> {
        check_dimensions(reference.dimensions(), candidate.dimensions())?;
        self.compare_gray(&luminance(reference), &luminance(candidate))
    }

    /// Compare two grayscale images of identical size
    pub fn compare_gray(
        &self,
        reference: &GrayImage,
        candidate: &GrayImage,
    ) -> Result<SimilarityResult, CompareError> {
        check_dimensions(reference.dimensions(), candidate.dimensions())?;

        let map = ssim_map(reference, candidate, &self.params);
        let score = map.mean().clamp(0.0, 1.0);

        let (width, height) = reference.dimensions();
        let diff_map = GrayImage::from_fn(width, height, |x, y| {
            let value = map.values[y as usize * map.width + x as usize];
            Luma([(value.clamp(0.0, 1.0) * 255.0) as u8])
        });

        tracing::trace!(
            width,
            height,
            window = map.window_size,
            score,
            "Computed SSIM"
        );

        Ok(SimilarityResult { score, diff_map })
    }
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self {
            params: SsimParams {
                window_size: 7,
                k1: 0.01,
                k2: 0.03,
            },
        }
    }
}

/// Compare two images with the standard SSIM parameters
pub fn compare(reference: &RgbImage, candidate: &RgbImage) -> Result<SimilarityResult, CompareError> {
    SimilarityEngine::default().compare(reference, candidate)
}

/// 8-bit luma with BT.601 weights (0.299, 0.587, 0.114), rounded.
///
/// Matches the usual camera-pipeline conversion. Rec. 709 weights would make
/// some hue changes of equal brightness invisible.
pub fn luminance(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
        Luma([((weighted + 500) / 1000) as u8])
    })
}

fn check_dimensions(reference: (u32, u32), candidate: (u32, u32)) -> Result<(), CompareError> {
    if reference != candidate {
        return Err(CompareError::DimensionMismatch {
            reference,
            candidate,
        });
    }

    let (width, height) = reference;
    if width == 0 || height == 0 {
        return Err(CompareError::EmptyImage { width, height });
    }

    Ok(())
}
