//! Cropping regions out of frames.

use super::{PixelRect, Region};
use crate::core::frame::Frame;
use crate::error::RegionError;
use image::{imageops, RgbImage};

/// Crop `region` out of `frame`.
///
/// The fractional geometry is resolved against the frame's current size and
/// clipped to it. The result is an owned copy.
pub fn extract(frame: &Frame, region: &Region) -> Result<RgbImage, RegionError> {
    let (width, height) = frame.dimensions();
    let rect = region.to_pixel_rect(width, height)?;
    crop(frame, rect)
}

/// Crop a pixel rectangle out of `frame`, clipping it to the frame bounds.
pub fn extract_pixels(frame: &Frame, rect: PixelRect) -> Result<RgbImage, RegionError> {
    let (width, height) = frame.dimensions();
    if frame.is_empty() {
        return Err(RegionError::EmptyFrame { width, height });
    }

    let clipped = rect.clamp_to(width, height).ok_or(RegionError::EmptyCrop {
        frame_width: width,
        frame_height: height,
    })?;
    crop(frame, clipped)
}

fn crop(frame: &Frame, rect: PixelRect) -> Result<RgbImage, RegionError> {
    if rect.area() == 0 {
        let (frame_width, frame_height) = frame.dimensions();
        return Err(RegionError::EmptyCrop {
            frame_width,
            frame_height,
        });
    }

    Ok(imageops::crop_imm(frame.pixels(), rect.x, rect.y, rect.width, rect.height).to_image())
}
