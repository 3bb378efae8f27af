//! Windowed SSIM statistics.
//!
//! Local means, variances and covariance come from a uniform box filter with
//! symmetric (half-sample) reflection at the borders. Rows are filtered in
//! parallel; every output value is computed by a fixed sequence of
//! operations, so results are identical across runs and thread counts.

use image::GrayImage;
use rayon::prelude::*;

/// Dynamic range of 8-bit luminance
const DATA_RANGE: f64 = 255.0;

/// Resolved SSIM parameters for one comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SsimParams {
    pub window_size: u32,
    pub k1: f64,
    pub k2: f64,
}

/// Per-pixel SSIM values in row-major order
#[derive(Debug, Clone)]
pub(crate) struct SsimMap {
    pub values: Vec<f64>,
    pub width: usize,
    pub height: usize,
    /// Window side actually used (may be smaller than requested)
    pub window_size: usize,
}

impl SsimMap {
    /// Mean SSIM, ignoring the border where the window hangs off the image.
    ///
    /// Falls back to the whole map when the border would swallow it.
    pub fn mean(&self) -> f64 {
        let pad = (self.window_size - 1) / 2;
        let (x0, x1, y0, y1) = if self.width > 2 * pad && self.height > 2 * pad {
            (pad, self.width - pad, pad, self.height - pad)
        } else {
            (0, self.width, 0, self.height)
        };

        let mut sum = 0.0;
        for y in y0..y1 {
            let row = &self.values[y * self.width..(y + 1) * self.width];
            for value in &row[x0..x1] {
                sum += value;
            }
        }

        sum / ((x1 - x0) * (y1 - y0)) as f64
    }
}

/// Largest odd window not exceeding `requested` or the smaller image side
pub(crate) fn effective_window(requested: u32, width: u32, height: u32) -> usize {
    let limit = requested.min(width).min(height).max(1) as usize;
    if limit % 2 == 0 {
        limit - 1
    } else {
        limit
    }
}

/// Compute the SSIM map of two equally sized grayscale images
pub(crate) fn ssim_map(a: &GrayImage, b: &GrayImage, params: &SsimParams) -> SsimMap {
    debug_assert_eq!(a.dimensions(), b.dimensions());

    let (w, h) = a.dimensions();
    let width = w as usize;
    let height = h as usize;
    let window = effective_window(params.window_size, w, h);
    let radius = window / 2;

    let x: Vec<f64> = a.as_raw().iter().map(|&v| v as f64).collect();
    let y: Vec<f64> = b.as_raw().iter().map(|&v| v as f64).collect();
    let xx: Vec<f64> = x.iter().map(|v| v * v).collect();
    let yy: Vec<f64> = y.iter().map(|v| v * v).collect();
    let xy: Vec<f64> = x.iter().zip(&y).map(|(p, q)| p * q).collect();

    let ux = box_filter(&x, width, height, radius);
    let uy = box_filter(&y, width, height, radius);
    let uxx = box_filter(&xx, width, height, radius);
    let uyy = box_filter(&yy, width, height, radius);
    let uxy = box_filter(&xy, width, height, radius);

    // Sample covariance over the window
    let samples = (window * window) as f64;
    let cov_norm = if samples > 1.0 {
        samples / (samples - 1.0)
    } else {
        1.0
    };

    let c1 = (params.k1 * DATA_RANGE).powi(2);
    let c2 = (params.k2 * DATA_RANGE).powi(2);

    let values = (0..width * height)
        .into_par_iter()
        .map(|i| {
            let (mx, my) = (ux[i], uy[i]);
            let vx = cov_norm * (uxx[i] - mx * mx);
            let vy = cov_norm * (uyy[i] - my * my);
            let vxy = cov_norm * (uxy[i] - mx * my);

            let a1 = 2.0 * (mx * my) + c1;
            let a2 = 2.0 * vxy + c2;
            let b1 = mx * mx + my * my + c1;
            let b2 = vx + vy + c2;

            (a1 * a2) / (b1 * b2)
        })
        .collect();

    SsimMap {
        values,
        width,
        height,
        window_size: window,
    }
}

/// Separable mean filter of side `2 * radius + 1`
fn box_filter(src: &[f64], width: usize, height: usize, radius: usize) -> Vec<f64> {
    let size = (2 * radius + 1) as f64;

    let mut horizontal = vec![0.0; src.len()];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row_index, row)| {
            let source = &src[row_index * width..(row_index + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                let mut sum = 0.0;
                for k in 0..=2 * radius {
                    sum += source[reflect(x as isize + k as isize - radius as isize, width)];
                }
                *out = sum / size;
            }
        });

    let mut output = vec![0.0; src.len()];
    output
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row_index, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let mut sum = 0.0;
                for k in 0..=2 * radius {
                    let sy = reflect(row_index as isize + k as isize - radius as isize, height);
                    sum += horizontal[sy * width + x];
                }
                *out = sum / size;
            }
        });

    output
}

/// Mirror an out-of-range index back into `0..len` (d c b a | a b c d)
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    let mut i = index;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= len {
            i = 2 * len - i - 1;
        } else {
            return i as usize;
        }
    }
}
