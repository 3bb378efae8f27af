//! # Session Module
//!
//! The single owner of the reference image, region geometry and threshold.
//!
//! Every mutation goes through one of the operations below. Each operation
//! either completes or fails before touching state, so a failed capture or
//! region update leaves the session exactly as it was.
//!
//! ## Example
//! ```rust,ignore
//! let mut session = SessionState::new(SessionConfig::default());
//! session.capture(&frame)?;
//! let comparison = session.compare_live(&next_frame)?;
//! println!("{} ({:.3})", comparison.decision.label, comparison.result.score());
//! ```

mod types;

pub use types::{Comparison, PendingComparison, ReferenceImage, SessionConfig};

use crate::core::decision::{DecisionPolicy, ThresholdPolicy};
use crate::core::frame::Frame;
use crate::core::region::{extract, Region, RegionBounds};
use crate::core::similarity::SimilarityEngine;
use crate::error::{RegionError, SessionError};
use std::sync::Arc;

/// Interactive comparison session
#[derive(Debug)]
pub struct SessionState {
    region: Region,
    policy: ThresholdPolicy,
    engine: SimilarityEngine,
    reference: Option<Arc<ReferenceImage>>,
    last_comparison: Option<Comparison>,
}

impl SessionState {
    /// Start a session with no reference
    pub fn new(config: SessionConfig) -> Self {
        Self {
            region: config.region,
            policy: ThresholdPolicy::new(config.threshold),
            engine: SimilarityEngine::default(),
            reference: None,
            last_comparison: None,
        }
    }

    /// Use a custom similarity engine
    pub fn with_engine(mut self, engine: SimilarityEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Seed the session with a previously persisted reference
    pub fn with_reference(mut self, reference: ReferenceImage) -> Self {
        self.reference = Some(Arc::new(reference));
        self
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn threshold(&self) -> f64 {
        self.policy.threshold()
    }

    pub fn engine(&self) -> &SimilarityEngine {
        &self.engine
    }

    /// Result of the most recent successful comparison
    pub fn last_comparison(&self) -> Option<&Comparison> {
        self.last_comparison.as_ref()
    }

    /// Capture the current region of `frame` as the new reference
    pub fn capture(&mut self, frame: &Frame) -> Result<Arc<ReferenceImage>, RegionError> {
        let region = self.region;
        self.capture_region(frame, region)
    }

    /// Capture with explicit geometry, adopting it as the current region
    pub fn capture_region(
        &mut self,
        frame: &Frame,
        region: Region,
    ) -> Result<Arc<ReferenceImage>, RegionError> {
        let pixels = extract(frame, &region)?;
        let reference = Arc::new(ReferenceImage::new(pixels));

        tracing::info!(
            width = reference.width(),
            height = reference.height(),
            frame = frame.sequence(),
            "Captured reference"
        );

        self.region = region;
        self.reference = Some(Arc::clone(&reference));
        self.last_comparison = None;
        Ok(reference)
    }

    /// Replace the region geometry after validating it
    pub fn update_region(&mut self, bounds: RegionBounds) -> Result<Region, RegionError> {
        let region = Region::try_from(bounds)?;
        tracing::debug!(%region, "Region updated");
        self.region = region;
        Ok(region)
    }

    /// Replace the threshold, clamped to `[0, 1]`. NaN leaves it unchanged.
    ///
    /// Returns the threshold now in effect.
    pub fn update_threshold(&mut self, value: f64) -> f64 {
        if value.is_nan() {
            tracing::warn!("Ignoring NaN threshold");
            return self.threshold();
        }
        self.policy = ThresholdPolicy::new(value);
        tracing::debug!(threshold = self.threshold(), "Threshold updated");
        self.threshold()
    }

    /// Compare the live region of `frame` against the reference
    pub fn compare_live(&mut self, frame: &Frame) -> Result<Comparison, SessionError> {
        let comparison = self.prepare_comparison(frame)?.run(&self.engine)?;
        self.record(comparison.clone());
        Ok(comparison)
    }

    /// Snapshot everything a comparison needs so it can run elsewhere
    pub fn prepare_comparison(&self, frame: &Frame) -> Result<PendingComparison, SessionError> {
        let reference = self.reference.clone().ok_or(SessionError::NoReference)?;
        let live = extract(frame, &self.region)?;

        Ok(PendingComparison::new(reference, live, self.policy, frame.sequence()))
    }

    /// Store a comparison produced off-thread.
    ///
    /// A comparison made against a reference that has since been replaced
    /// is discarded; returns whether it was kept.
    pub fn record(&mut self, comparison: Comparison) -> bool {
        if !self.is_current(&comparison) {
            tracing::debug!(
                frame = comparison.frame_sequence,
                "Discarding comparison against a replaced reference"
            );
            return false;
        }
        self.last_comparison = Some(comparison);
        true
    }

    /// Whether `comparison` was made against the current reference
    pub fn is_current(&self, comparison: &Comparison) -> bool {
        self.reference
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &comparison.reference))
    }

    /// The current reference, if one has been captured
    pub fn current_reference(&self) -> Option<Arc<ReferenceImage>> {
        self.reference.clone()
    }

    /// Whether a reference exists
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decision::Label;
    use crate::error::CompareError;
    use image::{Rgb, RgbImage};

    fn scene(width: u32, height: u32, offset: u32) -> Frame {
        Frame::new(RgbImage::from_fn(width, height, |x, y| {
            let v = (((x + offset) / 8 + y / 8) % 2) as u8 * 200;
            Rgb([v, v, v])
        }))
    }

    #[test]
    fn compare_without_reference_fails() {
        let mut session = SessionState::default();
        let result = session.compare_live(&scene(640, 480, 0));

        assert_eq!(result.unwrap_err(), SessionError::NoReference);
        assert!(session.last_comparison().is_none());
    }

    #[test]
    fn capture_then_compare_same_frame_is_similar() {
        let mut session = SessionState::default();
        let frame = scene(640, 480, 0);

        let reference = session.capture(&frame).unwrap();
        assert_eq!(reference.dimensions(), (384, 288));

        let comparison = session.compare_live(&frame).unwrap();
        assert_eq!(comparison.result.score(), 1.0);
        assert_eq!(comparison.decision.label, Label::Similar);
        assert!(session.last_comparison().is_some());
    }

    #[test]
    fn changed_scene_is_dissimilar() {
        let mut session = SessionState::new(SessionConfig {
            threshold: 0.95,
            ..SessionConfig::default()
        });
        session.capture(&scene(640, 480, 0)).unwrap();

        let comparison = session.compare_live(&scene(640, 480, 4)).unwrap();
        assert_eq!(comparison.decision.label, Label::Dissimilar);
    }

    #[test]
    fn region_change_without_recapture_is_dimension_mismatch() {
        let mut session = SessionState::default();
        let frame = scene(640, 480, 0);
        session.capture(&frame).unwrap();

        session
            .update_region(RegionBounds {
                top: 0.1,
                left: 0.1,
                bottom: 0.5,
                right: 0.5,
            })
            .unwrap();

        let error = session.compare_live(&frame).unwrap_err();
        assert!(matches!(
            error,
            SessionError::Compare(CompareError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn resolution_change_without_recapture_is_dimension_mismatch() {
        let mut session = SessionState::default();
        session.capture(&scene(640, 480, 0)).unwrap();

        let error = session.compare_live(&scene(1280, 720, 0)).unwrap_err();
        assert!(matches!(
            error,
            SessionError::Compare(CompareError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn invalid_region_update_leaves_state_unchanged() {
        let mut session = SessionState::default();
        let before = session.region();

        let result = session.update_region(RegionBounds {
            top: 0.5,
            left: 0.9,
            bottom: 0.6,
            right: 0.1,
        });

        assert!(result.is_err());
        assert_eq!(session.region(), before);
    }

    #[test]
    fn failed_capture_keeps_previous_reference() {
        let mut session = SessionState::default();
        let first = session.capture(&scene(640, 480, 0)).unwrap();

        let empty = Frame::new(RgbImage::new(0, 0));
        assert!(session.capture(&empty).is_err());

        let kept = session.current_reference().unwrap();
        assert!(Arc::ptr_eq(&first, &kept));
    }

    #[test]
    fn capture_region_adopts_geometry() {
        let mut session = SessionState::default();
        let region = Region::new(0.0, 0.0, 0.5, 0.5).unwrap();

        let reference = session.capture_region(&scene(100, 100, 0), region).unwrap();
        assert_eq!(reference.dimensions(), (50, 50));
        assert_eq!(session.region(), region);
    }

    #[test]
    fn threshold_updates_are_clamped() {
        let mut session = SessionState::default();

        assert_eq!(session.update_threshold(1.4), 1.0);
        assert_eq!(session.update_threshold(-2.0), 0.0);
        assert_eq!(session.update_threshold(0.6), 0.6);
        assert_eq!(session.update_threshold(f64::NAN), 0.6);
    }

    #[test]
    fn recapture_replaces_reference() {
        let mut session = SessionState::default();
        let first = session.capture(&scene(640, 480, 0)).unwrap();
        let second = session.capture(&scene(640, 480, 4)).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &session.current_reference().unwrap()));
    }

    #[test]
    fn pending_comparison_snapshots_reference() {
        let mut session = SessionState::default();
        let frame = scene(640, 480, 0);
        session.capture(&frame).unwrap();

        let pending = session.prepare_comparison(&frame).unwrap();
        session.capture(&scene(640, 480, 4)).unwrap();

        let comparison = pending.run(session.engine()).unwrap();
        assert_eq!(comparison.result.score(), 1.0);
    }

    #[test]
    fn comparison_against_replaced_reference_is_not_recorded() {
        let mut session = SessionState::default();
        let frame = scene(640, 480, 0);
        session.capture(&frame).unwrap();

        let pending = session.prepare_comparison(&frame).unwrap();
        session.capture(&frame).unwrap();
        let stale = pending.run(session.engine()).unwrap();

        assert!(!session.is_current(&stale));
        assert!(!session.record(stale));
        assert!(session.last_comparison().is_none());

        let fresh = session.prepare_comparison(&frame).unwrap().run(session.engine()).unwrap();
        assert!(session.record(fresh));
        assert!(session.last_comparison().is_some());
    }
}
