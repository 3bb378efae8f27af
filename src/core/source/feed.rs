//! Following a directory that a capture tool writes frames into.

use super::{load_frame, FrameSource, ImageFilter, Resolution};
use crate::core::frame::Frame;
use crate::error::SourceError;
use crossbeam_channel::{unbounded, Receiver};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Serves the newest image written into a watched directory.
///
/// Frames that arrive faster than the loop ticks are dropped: only the most
/// recent path is decoded. With nothing new, `next_frame` returns `None`.
/// The directory is unwatched when the feed is dropped.
pub struct FolderFeed {
    root: PathBuf,
    // Held for its Drop; events arrive on `arrivals`
    _watcher: RecommendedWatcher,
    arrivals: Receiver<PathBuf>,
    pending: Option<PathBuf>,
    resolution: Option<Resolution>,
    sequence: u64,
}

impl FolderFeed {
    /// Start watching `dir`. The newest existing image is served first.
    pub fn watch(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let root = dir.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SourceError::NotFound { path: root });
        }

        let (sender, arrivals) = unbounded();
        let filter = ImageFilter::new();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    if let Some(path) = Self::process_event(&filter, event) {
                        let _ = sender.send(path);
                    }
                }
                Err(e) => tracing::warn!("Frame folder watch error: {}", e),
            }
        })
        .map_err(|e| SourceError::WatchFailed {
            path: root.clone(),
            reason: e.to_string(),
        })?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| SourceError::WatchFailed {
                path: root.clone(),
                reason: e.to_string(),
            })?;

        let pending = Self::newest_existing(&root);
        tracing::info!("Watching {} for frames", root.display());

        Ok(Self {
            root,
            _watcher: watcher,
            arrivals,
            pending,
            resolution: None,
            sequence: 0,
        })
    }

    /// Keep created or rewritten frame files, drop everything else
    fn process_event(filter: &ImageFilter, event: Event) -> Option<PathBuf> {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => event
                .paths
                .into_iter()
                .filter(|p| filter.should_include(p))
                .last(),
            _ => None,
        }
    }

    /// Most recently modified frame file; equal times fall back to name order
    fn newest_existing(root: &Path) -> Option<PathBuf> {
        let filter = ImageFilter::new();
        WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && filter.should_include(entry.path()))
            .filter_map(|entry| {
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((modified, entry.into_path()))
            })
            .max()
            .map(|(_, path)| path)
    }
}

impl FrameSource for FolderFeed {
    fn next_frame(&mut self) -> Option<Frame> {
        // Newer arrivals supersede older ones
        while let Ok(path) = self.arrivals.try_recv() {
            self.pending = Some(path);
        }

        let path = self.pending.take()?;
        match load_frame(&path, self.sequence + 1, self.resolution) {
            Ok(frame) => {
                self.sequence += 1;
                Some(frame)
            }
            Err(e) => {
                // Most likely still being written; retry next tick
                tracing::debug!("{}", e);
                if path.exists() {
                    self.pending = Some(path);
                }
                None
            }
        }
    }

    fn set_resolution(&mut self, resolution: Option<Resolution>) {
        self.resolution = resolution;
    }

    fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    fn describe(&self) -> String {
        format!("watched folder {}", self.root.display())
    }
}
