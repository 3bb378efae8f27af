//! A single snapshot file as a frame source.

use super::{load_frame, FrameSource, Resolution};
use crate::core::frame::Frame;
use crate::error::SourceError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Serves one image file, re-decoding it only when it changes on disk.
///
/// Between changes the last decoded frame is served again, so a compare can
/// run every tick even when the capture tool updates the file less often.
pub struct StillSource {
    path: PathBuf,
    resolution: Option<Resolution>,
    modified: Option<SystemTime>,
    cached: Option<Frame>,
    sequence: u64,
}

impl StillSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(SourceError::NotFound { path });
        }

        Ok(Self {
            path,
            resolution: None,
            modified: None,
            cached: None,
            sequence: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reload(&mut self, modified: Option<SystemTime>) -> Option<Frame> {
        match load_frame(&self.path, self.sequence + 1, self.resolution) {
            Ok(frame) => {
                self.sequence += 1;
                self.modified = modified;
                self.cached = Some(frame.clone());
                Some(frame)
            }
            Err(e) => {
                // Possibly mid-write; fall back to the last good frame
                tracing::debug!("{}", e);
                self.cached.clone()
            }
        }
    }
}

impl FrameSource for StillSource {
    fn next_frame(&mut self) -> Option<Frame> {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => Some(modified),
            Err(e) => {
                tracing::warn!("Snapshot {} unavailable: {}", self.path.display(), e);
                return None;
            }
        };

        if self.cached.is_some() && modified == self.modified {
            return self.cached.clone();
        }

        self.reload(modified)
    }

    fn set_resolution(&mut self, resolution: Option<Resolution>) {
        if resolution != self.resolution {
            self.resolution = resolution;
            // Force a re-decode at the new size
            self.cached = None;
            self.modified = None;
        }
    }

    fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    fn describe(&self) -> String {
        format!("snapshot file {}", self.path.display())
    }
}
