//! # Storage Module
//!
//! Persists the session between runs: a small JSON config record and the
//! reference image as a PNG, both inside one state directory.
//!
//! ## Layout
//! ```text
//! <state dir>/
//!   config.json     {top, right, bottom, left, threshold}
//!   reference.png   last captured region
//! ```
//!
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a crash never leaves a half-written file behind. Reading a
//! missing or corrupt config yields the defaults instead of an error.

mod config;

pub use config::ConfigRecord;

use crate::core::session::{ReferenceImage, SessionConfig, SessionState};
use crate::error::StorageError;
use chrono::{DateTime, Utc};
use image::ImageFormat;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const CONFIG_FILE: &str = "config.json";
const REFERENCE_FILE: &str = "reference.png";

/// File-backed store for config and reference image
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Open the store in the platform config directory
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(Self::default_dir()?)
    }

    /// `<config dir>/roi-match`
    pub fn default_dir() -> Result<PathBuf, StorageError> {
        dirs::config_dir()
            .map(|dir| dir.join("roi-match"))
            .ok_or(StorageError::NoStateDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn reference_path(&self) -> PathBuf {
        self.dir.join(REFERENCE_FILE)
    }

    /// Load the config, falling back to defaults when missing or corrupt
    pub fn load_config(&self) -> SessionConfig {
        let path = self.config_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                return SessionConfig::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}, using defaults", path.display(), e);
                return SessionConfig::default();
            }
        };

        match serde_json::from_str::<ConfigRecord>(&contents) {
            Ok(record) => record.resolve(),
            Err(e) => {
                tracing::warn!("Corrupt config at {}: {}, using defaults", path.display(), e);
                SessionConfig::default()
            }
        }
    }

    /// Persist the config record
    pub fn save_config(&self, config: &SessionConfig) -> Result<(), StorageError> {
        let path = self.config_path();
        let json = serde_json::to_vec_pretty(&ConfigRecord::from(*config)).map_err(|e| {
            StorageError::Write {
                path: path.clone(),
                source: std::io::Error::other(e),
            }
        })?;
        self.write_atomic(&path, &json)?;
        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Load the persisted reference image, if any
    pub fn load_reference(&self) -> Result<Option<ReferenceImage>, StorageError> {
        let path = self.reference_path();
        if !path.exists() {
            return Ok(None);
        }

        let image = image::open(&path).map_err(|e| StorageError::CorruptReference {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let captured_at = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(ReferenceImage::restored(image.to_rgb8(), captured_at)))
    }

    /// Persist a reference image as PNG, returning its path
    pub fn save_reference(&self, reference: &ReferenceImage) -> Result<PathBuf, StorageError> {
        let path = self.reference_path();
        let mut buffer = Cursor::new(Vec::new());
        reference
            .pixels()
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| StorageError::Encode {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        self.write_atomic(&path, buffer.get_ref())?;
        tracing::info!("Saved reference to {}", path.display());
        Ok(path)
    }

    /// Delete the persisted reference, if present
    pub fn clear_reference(&self) -> Result<(), StorageError> {
        let path = self.reference_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write { path, source }),
        }
    }

    /// Build a session from the persisted config and reference.
    ///
    /// An unreadable reference is logged and skipped; the operator can
    /// recapture.
    pub fn load_session(&self) -> SessionState {
        let session = SessionState::new(self.load_config());

        match self.load_reference() {
            Ok(Some(reference)) => {
                tracing::info!(
                    width = reference.width(),
                    height = reference.height(),
                    "Restored reference"
                );
                session.with_reference(reference)
            }
            Ok(None) => session,
            Err(e) => {
                tracing::warn!("{}", e);
                session
            }
        }
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        let write_error = |source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut file = NamedTempFile::new_in(&self.dir).map_err(write_error)?;
        file.write_all(bytes).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(path).map_err(|e| write_error(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::region::Region;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn store() -> (TempDir, SessionStore) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path().join("state")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_directory() {
        let (_dir, store) = store();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn missing_config_gives_defaults() {
        let (_dir, store) = store();
        assert_eq!(store.load_config(), SessionConfig::default());
    }

    #[test]
    fn corrupt_config_gives_defaults() {
        let (_dir, store) = store();
        fs::write(store.config_path(), "{ not json").unwrap();
        assert_eq!(store.load_config(), SessionConfig::default());
    }

    #[test]
    fn config_round_trips() {
        let (_dir, store) = store();
        let config = SessionConfig {
            region: Region::new(0.1, 0.25, 0.6, 0.75).unwrap(),
            threshold: 0.72,
        };

        store.save_config(&config).unwrap();
        assert_eq!(store.load_config(), config);
    }

    #[test]
    fn missing_reference_is_none() {
        let (_dir, store) = store();
        assert!(store.load_reference().unwrap().is_none());
    }

    #[test]
    fn reference_survives_reload() {
        let (_dir, store) = store();
        let pixels = RgbImage::from_fn(12, 9, |x, y| Rgb([x as u8 * 20, y as u8 * 25, 7]));
        store.save_reference(&ReferenceImage::new(pixels.clone())).unwrap();

        let loaded = store.load_reference().unwrap().unwrap();
        assert_eq!(loaded.pixels(), &pixels);
    }

    #[test]
    fn corrupt_reference_is_an_error_but_session_still_loads() {
        let (_dir, store) = store();
        fs::write(store.reference_path(), b"not a png").unwrap();

        assert!(matches!(
            store.load_reference(),
            Err(StorageError::CorruptReference { .. })
        ));
        assert!(!store.load_session().has_reference());
    }

    #[test]
    fn clear_reference_is_idempotent() {
        let (_dir, store) = store();
        store
            .save_reference(&ReferenceImage::new(RgbImage::new(2, 2)))
            .unwrap();

        store.clear_reference().unwrap();
        store.clear_reference().unwrap();
        assert!(store.load_reference().unwrap().is_none());
    }

    #[test]
    fn load_session_restores_config_and_reference() {
        let (_dir, store) = store();
        let config = SessionConfig {
            region: Region::new(0.0, 0.0, 0.5, 0.5).unwrap(),
            threshold: 0.9,
        };
        store.save_config(&config).unwrap();
        store
            .save_reference(&ReferenceImage::new(RgbImage::new(3, 3)))
            .unwrap();

        let session = store.load_session();
        assert_eq!(session.region(), config.region);
        assert_eq!(session.threshold(), 0.9);
        assert_eq!(session.current_reference().unwrap().dimensions(), (3, 3));
    }
}
