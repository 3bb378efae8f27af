//! # Error Module
//!
//! Error types for region matching.
//!
//! ## Design Principles
//! - **Never panic** on frames or files - return errors instead
//! - **Include context** - sizes, paths, what went wrong
//! - **Recovery hints** - most comparison failures are fixed by recapturing

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum RoiMatchError {
    #[error("Region error: {0}")]
    Region(#[from] RegionError),

    #[error("Comparison error: {0}")]
    Compare(#[from] CompareError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Frame source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Invalid region geometry or a crop that collapses to nothing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegionError {
    #[error("Invalid region: {reason}")]
    InvalidBounds { reason: String },

    #[error("Invalid region: frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error(
        "Invalid region: crop of {frame_width}x{frame_height} frame is empty after clipping. \
         Adjust the region or recapture."
    )]
    EmptyCrop { frame_width: u32, frame_height: u32 },
}

impl RegionError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        RegionError::InvalidBounds {
            reason: reason.into(),
        }
    }
}

/// Errors raised by the similarity engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompareError {
    #[error(
        "Dimension mismatch: reference is {}x{}, live region is {}x{}. \
         Recapture the reference after changing the region or resolution.",
        .reference.0, .reference.1, .candidate.0, .candidate.1
    )]
    DimensionMismatch {
        reference: (u32, u32),
        candidate: (u32, u32),
    },

    #[error("Cannot compare an empty image ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Invalid SSIM configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised by session operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("No reference captured yet. Capture one before comparing.")]
    NoReference,

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Compare(#[from] CompareError),
}

/// Errors reading or writing persisted state
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode image {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Reference image at {path} is unreadable: {reason}. Delete it and recapture.")]
    CorruptReference { path: PathBuf, reason: String },

    #[error("No state directory available; pass --state-dir explicitly")]
    NoStateDir,
}

/// Errors opening a frame source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Frame source not found: {path}")]
    NotFound { path: PathBuf },

    #[error("No image frames found in {path}")]
    NoFrames { path: PathBuf },

    #[error("Failed to watch {path}: {reason}")]
    WatchFailed { path: PathBuf, reason: String },

    #[error("Failed to decode frame {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// Errors in configuration values supplied by the operator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Threshold {value} is outside 0.0-1.0")]
    ThresholdOutOfRange { value: f64 },

    #[error("Invalid resolution '{0}', expected WIDTHxHEIGHT or 'native'")]
    InvalidResolution(String),

    #[error("Unrecognised command '{0}'")]
    InvalidCommand(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, RoiMatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_includes_sizes_and_hint() {
        let error = CompareError::DimensionMismatch {
            reference: (384, 288),
            candidate: (200, 100),
        };
        let message = error.to_string();
        assert!(message.contains("384x288"));
        assert!(message.contains("200x100"));
        assert!(message.contains("Recapture"));
    }

    #[test]
    fn no_reference_suggests_capture() {
        let message = SessionError::NoReference.to_string();
        assert!(message.contains("Capture"));
    }

    #[test]
    fn session_error_wraps_transparently() {
        let inner = RegionError::invalid("left must be less than right");
        let wrapped = SessionError::from(inner.clone());
        assert_eq!(wrapped.to_string(), inner.to_string());
    }

    #[test]
    fn corrupt_reference_includes_path() {
        let error = StorageError::CorruptReference {
            path: PathBuf::from("/state/reference.png"),
            reason: "bad header".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/state/reference.png"));
        assert!(message.contains("recapture"));
    }
}
