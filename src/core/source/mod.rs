//! # Frame Source Module
//!
//! Where frames come from. The monitor pulls one frame per tick from a
//! [`FrameSource`]; a source that has nothing new returns `None` and the
//! tick is skipped.
//!
//! ## Sources
//! - [`StillSource`] - one image file, re-read whenever it changes on disk
//!   (a snapshot file kept up to date by a capture tool)
//! - [`SequenceSource`] - the image files of a directory, in name order
//! - [`FolderFeed`] - a watched directory; the newest arriving image wins
//!
//! All sources can be asked for a target resolution, in which case every
//! frame is resized before it is handed out.

mod feed;
mod filter;
mod sequence;
mod still;

pub use feed::FolderFeed;
pub use filter::ImageFilter;
pub use sequence::SequenceSource;
pub use still::StillSource;

use crate::core::frame::Frame;
use crate::error::{ConfigError, SourceError};
use image::{imageops, DynamicImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supplies frames to the monitor loop
pub trait FrameSource: Send {
    /// Next frame, or `None` if nothing is available this tick
    fn next_frame(&mut self) -> Option<Frame>;

    /// Ask for frames at a given size; `None` keeps the native size
    fn set_resolution(&mut self, resolution: Option<Resolution>);

    /// Currently requested resolution
    fn resolution(&self) -> Option<Resolution>;

    /// Human-readable description for logs and the CLI
    fn describe(&self) -> String;
}

/// Target frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse `WIDTHxHEIGHT`, or `native` for `None`
    pub fn parse(text: &str) -> Result<Option<Self>, ConfigError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("native") {
            return Ok(None);
        }

        let invalid = || ConfigError::InvalidResolution(text.to_string());
        let (w, h) = text
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Some(Self { width, height }))
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Open the most fitting source for `path`.
///
/// A file becomes a [`StillSource`]. A directory becomes a [`FolderFeed`]
/// when `follow` is set, otherwise a [`SequenceSource`].
pub fn open_source(
    path: &Path,
    follow: bool,
    looping: bool,
) -> Result<Box<dyn FrameSource>, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound {
            path: path.to_path_buf(),
        });
    }

    if path.is_file() {
        return Ok(Box::new(StillSource::open(path)?));
    }

    if follow {
        Ok(Box::new(FolderFeed::watch(path)?))
    } else {
        Ok(Box::new(SequenceSource::open(path, looping)?))
    }
}

/// Decode an image file into a frame, resizing when a resolution is set
pub fn load_frame(
    path: &Path,
    sequence: u64,
    resolution: Option<Resolution>,
) -> Result<Frame, SourceError> {
    let image = image::open(path).map_err(|e| SourceError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Frame::from_dynamic(fit(image, resolution), sequence))
}

fn fit(image: DynamicImage, resolution: Option<Resolution>) -> DynamicImage {
    match resolution {
        Some(r) if (image.width(), image.height()) != (r.width, r.height) => {
            let rgb = image.to_rgb8();
            DynamicImage::ImageRgb8(imageops::resize(
                &rgb,
                r.width,
                r.height,
                imageops::FilterType::Triangle,
            ))
        }
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn parses_resolutions() {
        assert_eq!(Resolution::parse("640x480").unwrap(), Some(Resolution::new(640, 480)));
        assert_eq!(Resolution::parse(" 1920X1080 ").unwrap(), Some(Resolution::new(1920, 1080)));
        assert_eq!(Resolution::parse("native").unwrap(), None);
        assert!(Resolution::parse("640").is_err());
        assert!(Resolution::parse("0x480").is_err());
        assert!(Resolution::parse("axb").is_err());
    }

    #[test]
    fn load_frame_resizes_to_requested_resolution() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(40, 30, Rgb([10, 20, 30])).save(&path).unwrap();

        let native = load_frame(&path, 1, None).unwrap();
        assert_eq!(native.dimensions(), (40, 30));

        let resized = load_frame(&path, 2, Some(Resolution::new(20, 15))).unwrap();
        assert_eq!(resized.dimensions(), (20, 15));
        assert_eq!(resized.sequence(), 2);
    }

    #[test]
    fn open_source_rejects_missing_path() {
        let result = open_source(Path::new("/nonexistent/camera/feed"), false, false);
        assert!(matches!(result, Err(SourceError::NotFound { .. })));
    }

    #[test]
    fn open_source_picks_still_for_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.png");
        RgbImage::new(4, 4).save(&path).unwrap();

        let source = open_source(&path, false, false).unwrap();
        assert!(source.describe().contains("snap.png"));
    }
}
