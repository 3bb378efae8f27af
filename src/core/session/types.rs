//! Value types owned or produced by a session.

use crate::core::decision::{Decision, DecisionPolicy, ThresholdPolicy};
use crate::core::region::Region;
use crate::core::similarity::{SimilarityEngine, SimilarityResult};
use crate::error::CompareError;
use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Starting geometry and threshold for a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub region: Region,
    pub threshold: f64,
}

impl SessionConfig {
    pub const DEFAULT_THRESHOLD: f64 = 0.85;
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            region: Region::DEFAULT,
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}

/// The captured baseline region
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceImage {
    pixels: RgbImage,
    captured_at: DateTime<Utc>,
}

impl ReferenceImage {
    /// Wrap freshly captured pixels, stamped with the current time
    pub fn new(pixels: RgbImage) -> Self {
        Self::restored(pixels, Utc::now())
    }

    /// Rebuild a reference loaded from storage
    pub fn restored(pixels: RgbImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            pixels,
            captured_at,
        }
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// A finished comparison: the SSIM result plus its classification
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub result: SimilarityResult,
    pub decision: Decision,
    /// Threshold the decision was made against
    pub threshold: f64,
    /// Sequence number of the live frame
    pub frame_sequence: u64,
    pub compared_at: DateTime<Utc>,
    /// Reference the live region was scored against
    pub reference: Arc<ReferenceImage>,
}

/// Everything needed to run one comparison, detached from the session.
///
/// Holds its own handle to the reference, so a capture that happens while
/// this is queued or running never changes what it compares against.
#[derive(Debug, Clone)]
pub struct PendingComparison {
    reference: Arc<ReferenceImage>,
    live: RgbImage,
    policy: ThresholdPolicy,
    frame_sequence: u64,
}

impl PendingComparison {
    pub(crate) fn new(
        reference: Arc<ReferenceImage>,
        live: RgbImage,
        policy: ThresholdPolicy,
        frame_sequence: u64,
    ) -> Self {
        Self {
            reference,
            live,
            policy,
            frame_sequence,
        }
    }

    /// The live region image
    pub fn live(&self) -> &RgbImage {
        &self.live
    }

    pub fn frame_sequence(&self) -> u64 {
        self.frame_sequence
    }

    /// Score and classify
    pub fn run(self, engine: &SimilarityEngine) -> Result<Comparison, CompareError> {
        let result = engine.compare(self.reference.pixels(), &self.live)?;
        let decision = self.policy.decide(result.score());

        tracing::info!(
            score = result.score(),
            threshold = self.policy.threshold(),
            label = %decision.label,
            frame = self.frame_sequence,
            "Compared live region"
        );

        Ok(Comparison {
            result,
            decision,
            threshold: self.policy.threshold(),
            frame_sequence: self.frame_sequence,
            compared_at: Utc::now(),
            reference: self.reference,
        })
    }
}
