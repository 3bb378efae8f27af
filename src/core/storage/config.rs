//! The on-disk configuration record.

use crate::core::region::Region;
use crate::core::session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Flat record stored in `config.json`.
///
/// Every field is optional on read so that a partially written or older
/// file still yields usable values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl ConfigRecord {
    /// Validate into a session configuration.
    ///
    /// An incomplete or invalid rectangle falls back to the default region
    /// as a whole; a missing or non-finite threshold falls back to the
    /// default threshold and an out-of-range one is clamped.
    pub fn resolve(&self) -> SessionConfig {
        let region = match (self.top, self.left, self.bottom, self.right) {
            (Some(top), Some(left), Some(bottom), Some(right)) => {
                match Region::new(top, left, bottom, right) {
                    Ok(region) => region,
                    Err(e) => {
                        tracing::warn!("Stored region rejected ({}), using default", e);
                        Region::DEFAULT
                    }
                }
            }
            (None, None, None, None) => Region::DEFAULT,
            _ => {
                tracing::warn!("Stored region is incomplete, using default");
                Region::DEFAULT
            }
        };

        let threshold = match self.threshold {
            Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
            Some(value) => {
                tracing::warn!("Stored threshold {} rejected, using default", value);
                SessionConfig::DEFAULT_THRESHOLD
            }
            None => SessionConfig::DEFAULT_THRESHOLD,
        };

        SessionConfig { region, threshold }
    }
}

impl From<SessionConfig> for ConfigRecord {
    fn from(config: SessionConfig) -> Self {
        Self {
            top: Some(config.region.top()),
            right: Some(config.region.right()),
            bottom: Some(config.region.bottom()),
            left: Some(config.region.left()),
            threshold: Some(config.threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_resolves_to_defaults() {
        let config = ConfigRecord::default().resolve();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn documented_default_rectangle() {
        let region = ConfigRecord::default().resolve().region;
        assert_eq!(
            (region.top(), region.right(), region.bottom(), region.left()),
            (0.2, 0.8, 0.8, 0.2)
        );
    }

    #[test]
    fn inverted_region_falls_back() {
        let record = ConfigRecord {
            top: Some(0.9),
            right: Some(0.8),
            bottom: Some(0.1),
            left: Some(0.2),
            threshold: Some(0.5),
        };
        let config = record.resolve();

        assert_eq!(config.region, Region::DEFAULT);
        assert_eq!(config.threshold, 0.5);
    }

    #[test]
    fn partial_region_falls_back() {
        let record = ConfigRecord {
            top: Some(0.1),
            ..ConfigRecord::default()
        };
        assert_eq!(record.resolve().region, Region::DEFAULT);
    }

    #[test]
    fn threshold_is_clamped() {
        let record = ConfigRecord {
            threshold: Some(3.0),
            ..ConfigRecord::default()
        };
        assert_eq!(record.resolve().threshold, 1.0);
    }

    #[test]
    fn uses_documented_field_names() {
        let json = serde_json::to_string(&ConfigRecord::from(SessionConfig::default())).unwrap();
        for field in ["\"top\"", "\"right\"", "\"bottom\"", "\"left\"", "\"threshold\""] {
            assert!(json.contains(field), "{} missing from {}", field, json);
        }
    }
}
