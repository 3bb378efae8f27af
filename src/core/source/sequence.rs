//! Replaying a directory of recorded frames.

use super::{load_frame, FrameSource, ImageFilter, Resolution};
use crate::core::frame::Frame;
use crate::error::SourceError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Serves the image files of a directory in file-name order.
///
/// Only the top level of the directory is read. Undecodable files are
/// skipped with a warning.
pub struct SequenceSource {
    root: PathBuf,
    frames: Vec<PathBuf>,
    position: usize,
    looping: bool,
    resolution: Option<Resolution>,
    sequence: u64,
}

impl SequenceSource {
    /// List the frames in `dir`. Fails if there are none.
    pub fn open(dir: impl AsRef<Path>, looping: bool) -> Result<Self, SourceError> {
        let root = dir.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SourceError::NotFound { path: root });
        }

        let filter = ImageFilter::new();
        let mut frames: Vec<PathBuf> = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && filter.should_include(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(SourceError::NoFrames { path: root });
        }

        tracing::debug!("Found {} frames in {}", frames.len(), root.display());

        Ok(Self {
            root,
            frames,
            position: 0,
            looping,
            resolution: None,
            sequence: 0,
        })
    }

    /// Number of frame files found
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True once every frame has been served and looping is off
    pub fn is_exhausted(&self) -> bool {
        !self.looping && self.position >= self.frames.len()
    }
}

impl FrameSource for SequenceSource {
    fn next_frame(&mut self) -> Option<Frame> {
        // At most one full pass per call so a directory of bad files
        // cannot spin forever
        for _ in 0..self.frames.len() {
            if self.position >= self.frames.len() {
                if !self.looping {
                    return None;
                }
                self.position = 0;
            }

            let path = &self.frames[self.position];
            self.position += 1;

            match load_frame(path, self.sequence + 1, self.resolution) {
                Ok(frame) => {
                    self.sequence += 1;
                    return Some(frame);
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
        None
    }

    fn set_resolution(&mut self, resolution: Option<Resolution>) {
        self.resolution = resolution;
    }

    fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    fn describe(&self) -> String {
        format!(
            "{} frames in {}{}",
            self.frames.len(),
            self.root.display(),
            if self.looping { " (looping)" } else { "" }
        )
    }
}
